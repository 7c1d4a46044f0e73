//! Blocking GitHub REST client.

use crate::error::{KitError, Result};
use crate::pins::{self, ResolvedVersion};
use crate::ruleset::{self, RepoInfo, RulesetGateway, RulesetPayload, RulesetSummary};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("copilot-kit/", env!("CARGO_PKG_VERSION"));

/// Token from `GITHUB_TOKEN`, `GH_TOKEN`, or `gh auth token`.
pub fn discover_token() -> Option<String> {
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var) {
            if !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
    }
    let gh = which::which("gh").ok()?;
    let output = std::process::Command::new(gh)
        .args(["auth", "token"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}

pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct RepoResponse {
    #[serde(default)]
    security_and_analysis: Option<SecurityAndAnalysis>,
}

#[derive(Deserialize)]
struct SecurityAndAnalysis {
    #[serde(default)]
    advanced_security: Option<FeatureStatus>,
}

#[derive(Deserialize)]
struct FeatureStatus {
    status: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Client for `GITHUB_API_URL` (or the public API) with a discovered token.
    pub fn from_env() -> Result<Self> {
        let base = std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base, discover_token())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    fn send<T: DeserializeOwned>(&self, method: reqwest::Method, path: &str, req: RequestBuilder) -> Result<T> {
        debug!(%method, path, "github request");
        let resp = req.send()?;
        let resp = check(&method, path, resp)?;
        Ok(resp.json()?)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let req = self.request(reqwest::Method::GET, path);
        self.send(reqwest::Method::GET, path, req)
    }

    /// Resolve `tag` of `action` to the commit it points at.
    pub fn resolve_action_sha(&self, action: &str, tag: &str) -> Result<ResolvedVersion> {
        let id = pins::action_identity(action);
        let commit: CommitResponse = self.get(&format!("/repos/{id}/commits/{tag}"))?;
        Ok(ResolvedVersion {
            action: id.to_string(),
            sha: commit.sha,
            version_tag: tag.to_string(),
        })
    }

    /// Online pins for every known action without a recorded commit.
    pub fn resolve_unpinned(&self) -> Result<Vec<ResolvedVersion>> {
        pins::unpinned_actions()
            .into_iter()
            .map(|(action, tag)| self.resolve_action_sha(action, tag))
            .collect()
    }
}

fn check(method: &reqwest::Method, path: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<ApiError>()
        .map(|e| e.message)
        .unwrap_or_default();
    Err(KitError::GitHubApi {
        method: method.to_string(),
        path: path.to_string(),
        status: status.as_u16(),
        message,
    })
}

impl RulesetGateway for GitHubClient {
    fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.get::<serde_json::Value>("/user").is_ok()
    }

    fn get_repo_info(&self, dir: &Path) -> Result<RepoInfo> {
        ruleset::repo_info_from_git(dir)
    }

    fn has_advanced_security(&self, owner: &str, repo: &str) -> Result<bool> {
        let info: RepoResponse = self.get(&format!("/repos/{owner}/{repo}"))?;
        Ok(info
            .security_and_analysis
            .and_then(|s| s.advanced_security)
            .is_some_and(|a| a.status == "enabled"))
    }

    fn list_rulesets(&self, owner: &str, repo: &str) -> Result<Vec<RulesetSummary>> {
        self.get(&format!("/repos/{owner}/{repo}/rulesets"))
    }

    fn create_ruleset(&self, owner: &str, repo: &str, payload: &RulesetPayload) -> Result<RulesetSummary> {
        let path = format!("/repos/{owner}/{repo}/rulesets");
        let req = self.request(reqwest::Method::POST, &path).json(payload);
        self.send(reqwest::Method::POST, &path, req)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
