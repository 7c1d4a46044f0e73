use thiserror::Error;

#[derive(Debug, Error)]
pub enum KitError {
    #[error("not authenticated: set GITHUB_TOKEN or run 'gh auth login'")]
    NotAuthenticated,

    #[error("no GitHub remote found in {0}")]
    NoGitHubRemote(String),

    #[error("GitHub API {method} {path} failed with status {status}: {message}")]
    GitHubApi {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    #[error("invalid setup action pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, KitError>;
