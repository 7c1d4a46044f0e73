use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GITHUB_DIR: &str = ".github";
pub const WORKFLOWS_DIR: &str = ".github/workflows";
pub const AGENTS_DIR: &str = ".github/agents";
pub const SKILLS_DIR: &str = ".github/skills";
pub const INSTRUCTIONS_DIR: &str = ".github/instructions";

pub const CONFIG_FILE: &str = ".github/copilot-kit.yaml";
pub const REPO_INSTRUCTIONS_FILE: &str = ".github/copilot-instructions.md";
pub const SKILL_FILE: &str = "SKILL.md";
pub const MISE_CONFIG: &str = "mise.toml";

/// File stem of the generated Copilot workflow.
pub const SETUP_WORKFLOW_STEM: &str = "copilot-setup-steps";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn workflows_dir(root: &Path) -> PathBuf {
    root.join(WORKFLOWS_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn agents_dir(root: &Path) -> PathBuf {
    root.join(AGENTS_DIR)
}

pub fn skills_dir(root: &Path) -> PathBuf {
    root.join(SKILLS_DIR)
}

pub fn instructions_dir(root: &Path) -> PathBuf {
    root.join(INSTRUCTIONS_DIR)
}

pub fn repo_instructions_path(root: &Path) -> PathBuf {
    root.join(REPO_INSTRUCTIONS_FILE)
}

/// Both spellings of the setup workflow file name.
pub fn setup_workflow_file_names() -> [String; 2] {
    [
        format!("{SETUP_WORKFLOW_STEM}.yml"),
        format!("{SETUP_WORKFLOW_STEM}.yaml"),
    ]
}

/// Path of the setup workflow: `.yml` unless only a `.yaml` file exists.
pub fn setup_workflow_path(root: &Path) -> PathBuf {
    let dir = workflows_dir(root);
    let [yml, yaml] = setup_workflow_file_names();
    let yml_path = dir.join(yml);
    let yaml_path = dir.join(yaml);
    if !yml_path.exists() && yaml_path.exists() {
        yaml_path
    } else {
        yml_path
    }
}

/// `path` relative to `root`, with forward slashes.
pub fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap())
}

/// Agent and skill names: lowercase alphanumeric words joined by single hyphens.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 64 && name_re().is_match(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
