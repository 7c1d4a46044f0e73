use crate::error::Result;
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl WarnLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// PinMode
// ---------------------------------------------------------------------------

/// How `uses:` references are rendered when no command-line override is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    #[default]
    Floating,
    Placeholder,
    Pinned,
}

// ---------------------------------------------------------------------------
// SetupConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    #[serde(default = "default_runner")]
    pub runner: String,
    #[serde(default = "default_timeout")]
    pub timeout_minutes: u32,
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,
    /// Extra regex patterns for actions that count as setup actions.
    #[serde(default)]
    pub extra_setup_actions: Vec<String>,
    #[serde(default)]
    pub mise_github_token: bool,
    #[serde(default)]
    pub version_mode: PinMode,
}

fn default_runner() -> String {
    "ubuntu-latest".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_branches() -> Vec<String> {
    vec!["main".to_string()]
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            runner: default_runner(),
            timeout_minutes: default_timeout(),
            branches: default_branches(),
            extra_setup_actions: Vec::new(),
            mise_github_token: false,
            version_mode: PinMode::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// LintConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default = "default_max_description")]
    pub max_description_length: usize,
}

fn default_max_description() -> usize {
    1024
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_description_length: default_max_description(),
        }
    }
}

// ---------------------------------------------------------------------------
// RulesetConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetConfig {
    #[serde(default = "default_ruleset_name")]
    pub name: String,
    #[serde(default = "default_ruleset_branches")]
    pub branches: Vec<String>,
}

fn default_ruleset_name() -> String {
    "Copilot code review".to_string()
}

fn default_ruleset_branches() -> Vec<String> {
    vec!["~DEFAULT_BRANCH".to_string()]
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            name: default_ruleset_name(),
            branches: default_ruleset_branches(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub setup: SetupConfig,
    #[serde(default)]
    pub lint: LintConfig,
    #[serde(default)]
    pub ruleset: RulesetConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            setup: SetupConfig::default(),
            lint: LintConfig::default(),
            ruleset: RulesetConfig::default(),
        }
    }
}

impl Config {
    /// Load `.github/copilot-kit.yaml`. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level, message: String| warnings.push(ConfigWarning { level, message });

        if self.setup.runner.trim().is_empty() {
            push(WarnLevel::Error, "setup.runner must not be empty".to_string());
        }

        if self.setup.timeout_minutes == 0 {
            push(
                WarnLevel::Error,
                "setup.timeout_minutes must be greater than 0".to_string(),
            );
        } else if self.setup.timeout_minutes > 360 {
            push(
                WarnLevel::Warning,
                format!(
                    "setup.timeout_minutes={} exceeds the 360 minute job limit",
                    self.setup.timeout_minutes
                ),
            );
        }

        if self.setup.branches.is_empty() {
            push(
                WarnLevel::Warning,
                "setup.branches is empty; the workflow will only run on manual dispatch"
                    .to_string(),
            );
        }

        for pattern in &self.setup.extra_setup_actions {
            if let Err(e) = Regex::new(pattern) {
                push(
                    WarnLevel::Error,
                    format!("invalid pattern '{pattern}' in setup.extra_setup_actions: {e}"),
                );
            }
        }

        if self.lint.max_description_length == 0 {
            push(
                WarnLevel::Error,
                "lint.max_description_length must be greater than 0".to_string(),
            );
        }

        if self.ruleset.name.trim().is_empty() {
            push(WarnLevel::Error, "ruleset.name must not be empty".to_string());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
