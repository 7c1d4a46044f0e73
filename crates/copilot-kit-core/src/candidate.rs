//! Setup step candidates: building them from a detected environment and
//! reconciling candidates proposed by different sources.

use crate::environment::{DetectedEnvironment, RuntimeKind};
use crate::pins::{self, action_identity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateSource {
    /// Observed in an existing workflow file.
    Workflow,
    /// Inferred from version files or package manifests.
    VersionFile,
}

impl CandidateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateSource::Workflow => "workflow",
            CandidateSource::VersionFile => "version-file",
        }
    }
}

/// A prospective CI step before merge decides whether it is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupStepCandidate {
    /// Action identifier without a ref; empty for a plain `run` step.
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: CandidateSource,
}

impl SetupStepCandidate {
    pub fn action(action: &str, source: CandidateSource) -> Self {
        Self {
            action: action_identity(action).to_string(),
            version: None,
            config: None,
            run: None,
            name: None,
            source,
        }
    }

    pub fn run(command: &str, name: &str, source: CandidateSource) -> Self {
        Self {
            action: String::new(),
            version: None,
            config: None,
            run: Some(command.to_string()),
            name: Some(name.to_string()),
            source,
        }
    }

    pub fn with_config<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn is_action(&self) -> bool {
        !self.action.is_empty()
    }

    pub fn is_mise(&self) -> bool {
        self.is_action() && action_identity(&self.action) == pins::MISE_ACTION
    }

    /// Dedup key: the action without its ref, or the trimmed run command.
    pub fn identity(&self) -> String {
        if self.is_action() {
            action_identity(&self.action).to_string()
        } else {
            self.run.as_deref().unwrap_or_default().trim().to_string()
        }
    }

    /// Step name to render, falling back to the action's display name.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(n) if !n.trim().is_empty() => n.clone(),
            _ if self.is_action() => pins::action_display_name(&self.action),
            _ => "Run command".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Pass the repository token to mise so it can download from GitHub.
    pub mise_github_token: bool,
}

/// Map detected environment facts onto setup step candidates.
///
/// A mise config short-circuits everything else: mise provides the runtimes
/// and no discrete installers or install steps are proposed.
pub fn build(env: &DetectedEnvironment, options: &BuildOptions) -> Vec<SetupStepCandidate> {
    if env.has_mise_config {
        let mut mise = SetupStepCandidate::action(pins::MISE_ACTION, CandidateSource::VersionFile);
        if options.mise_github_token {
            mise = mise.with_config("github_token", "${{ secrets.GITHUB_TOKEN }}");
        }
        return vec![mise];
    }

    let mut candidates = Vec::new();

    let mut seen_runtimes = HashSet::new();
    for vf in &env.version_files {
        if !seen_runtimes.insert(vf.kind) {
            continue;
        }
        let source = CandidateSource::VersionFile;
        let candidate = match vf.kind {
            RuntimeKind::Node => SetupStepCandidate::action(pins::SETUP_NODE_ACTION, source)
                .with_config("node-version-file", &vf.filename),
            RuntimeKind::Python => SetupStepCandidate::action(pins::SETUP_PYTHON_ACTION, source)
                .with_config("python-version-file", &vf.filename),
            RuntimeKind::Java => SetupStepCandidate::action(pins::SETUP_JAVA_ACTION, source)
                .with_config("distribution", "temurin")
                .with_config("java-version-file", &vf.filename),
            RuntimeKind::Go => SetupStepCandidate::action(pins::SETUP_GO_ACTION, source)
                .with_config("go-version-file", &vf.filename),
            RuntimeKind::Ruby => {
                let ruby = SetupStepCandidate::action(pins::SETUP_RUBY_ACTION, source);
                match &vf.version {
                    Some(v) => ruby.with_config("ruby-version", v),
                    None => ruby,
                }
            }
        };
        candidates.push(candidate);
    }

    let mut seen_managers = HashSet::new();
    let managers: Vec<_> = env
        .package_managers
        .iter()
        .filter(|pm| seen_managers.insert(pm.kind))
        .collect();
    for pm in &managers {
        let name = if managers.len() == 1 {
            "Install dependencies".to_string()
        } else {
            format!("Install dependencies ({})", pm.kind)
        };
        candidates.push(SetupStepCandidate::run(
            &pm.install_command(),
            &name,
            CandidateSource::VersionFile,
        ));
    }

    candidates
}

// ---------------------------------------------------------------------------
// Merge / dedup
// ---------------------------------------------------------------------------

/// Combine two candidate lists. On an identity collision the `primary`
/// candidate is kept whole; the result holds one candidate per identity.
pub fn merge(
    primary: &[SetupStepCandidate],
    secondary: &[SetupStepCandidate],
) -> Vec<SetupStepCandidate> {
    let mut seen = HashSet::new();
    primary
        .iter()
        .chain(secondary.iter())
        .filter(|c| seen.insert(c.identity()))
        .cloned()
        .collect()
}

/// Candidates whose identity is not already in `existing`.
pub fn find_missing(
    candidates: &[SetupStepCandidate],
    existing: &HashSet<String>,
) -> Vec<SetupStepCandidate> {
    candidates
        .iter()
        .filter(|c| !existing.contains(&c.identity()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
