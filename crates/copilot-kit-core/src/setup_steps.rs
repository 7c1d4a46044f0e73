//! Create or update `.github/workflows/copilot-setup-steps.yml`.
//!
//! [`plan`] performs every read and computes the final content; [`apply`]
//! performs the single write. A dry run is a plan that is never applied.

use crate::candidate::{self, BuildOptions, SetupStepCandidate};
use crate::config::{PinMode, SetupConfig};
use crate::document;
use crate::environment;
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::pins::{self, ResolvedVersion};
use crate::synth::{self, VersionMode, WorkflowOptions};
use crate::update::{self, UpdateMethod};
use crate::workflow_scan::{self, SetupActionAllowlist};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupOutcome {
    Created,
    Updated,
    Unchanged,
}

impl SetupOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SetupOutcome::Created => "created",
            SetupOutcome::Updated => "updated",
            SetupOutcome::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub setup: SetupConfig,
    pub version_mode: VersionMode,
}

impl SetupOptions {
    /// Options for `setup`, with the version mode taken from the config.
    pub fn from_config(setup: &SetupConfig) -> Self {
        Self {
            setup: setup.clone(),
            version_mode: version_mode_for(setup.version_mode, Vec::new()),
        }
    }
}

/// The [`VersionMode`] for a configured [`PinMode`]. `resolved` pins take
/// precedence over the static table.
pub fn version_mode_for(mode: PinMode, resolved: Vec<ResolvedVersion>) -> VersionMode {
    match mode {
        PinMode::Floating => VersionMode::Floating,
        PinMode::Placeholder => VersionMode::Placeholder,
        PinMode::Pinned => {
            let mut pins = resolved;
            for pin in pins::static_pins() {
                if !pins.iter().any(|p| p.action == pin.action) {
                    pins.push(pin);
                }
            }
            VersionMode::Pinned(pins)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupPlan {
    pub outcome: SetupOutcome,
    pub path: PathBuf,
    /// Content to write; `None` when unchanged.
    pub content: Option<String>,
    /// Merged candidates from existing workflows and the environment.
    pub candidates: Vec<SetupStepCandidate>,
    /// Candidates that the written content adds.
    pub added: Vec<SetupStepCandidate>,
    /// How an existing file was updated; `None` unless `Updated`.
    pub method: Option<UpdateMethod>,
}

fn workflow_options(root: &Path, path: &Path, options: &SetupOptions) -> WorkflowOptions {
    WorkflowOptions {
        runner: options.setup.runner.clone(),
        timeout_minutes: options.setup.timeout_minutes,
        branches: options.setup.branches.clone(),
        self_path: paths::relative_display(root, path),
        version_mode: options.version_mode.clone(),
        ..WorkflowOptions::default()
    }
}

/// Discover candidates for `root`: setup actions from other workflows first,
/// then those inferred from the environment.
pub fn discover(root: &Path, setup: &SetupConfig) -> Result<Vec<SetupStepCandidate>> {
    let allowlist = SetupActionAllowlist::with_extra(&setup.extra_setup_actions)?;
    let exclude = paths::setup_workflow_file_names();
    let scanned = workflow_scan::scan(&paths::workflows_dir(root), &allowlist, &exclude);

    let env = environment::detect(root);
    let built = candidate::build(
        &env,
        &BuildOptions {
            mise_github_token: setup.mise_github_token,
        },
    );
    debug!(scanned = scanned.len(), built = built.len(), "discovered setup candidates");
    Ok(candidate::merge(&scanned, &built))
}

/// Decide between creating, updating or leaving the setup workflow alone.
pub fn plan(root: &Path, options: &SetupOptions) -> Result<SetupPlan> {
    let candidates = discover(root, &options.setup)?;
    let path = paths::setup_workflow_path(root);
    let workflow = workflow_options(root, &path, options);

    if !path.exists() {
        let content = synth::render(&candidates, &workflow);
        return Ok(SetupPlan {
            outcome: SetupOutcome::Created,
            path,
            content: Some(content),
            added: candidates.clone(),
            candidates,
            method: None,
        });
    }

    let existing = std::fs::read_to_string(&path)?;
    let identities = serde_yaml::from_str(&existing)
        .map(|v| document::step_identities(&v))
        .unwrap_or_default();
    let missing = candidate::find_missing(&candidates, &identities);

    if missing.is_empty() {
        return Ok(SetupPlan {
            outcome: SetupOutcome::Unchanged,
            path,
            content: None,
            candidates,
            added: Vec::new(),
            method: None,
        });
    }

    let output = update::update(&existing, &missing, &workflow);
    Ok(SetupPlan {
        outcome: SetupOutcome::Updated,
        path,
        content: Some(output.content),
        candidates,
        added: missing,
        method: Some(output.method),
    })
}

/// Write the planned content. Returns whether anything was written.
pub fn apply(plan: &SetupPlan, dry_run: bool) -> Result<bool> {
    match (&plan.content, dry_run) {
        (Some(content), false) => {
            io::atomic_write(&plan.path, content.as_bytes())?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;
    use tempfile::TempDir;

    fn repo(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        dir
    }

    fn steps(content: &str) -> Vec<Value> {
        let v: Value = serde_yaml::from_str(content).unwrap();
        document::first_job_steps(&v).unwrap().clone()
    }

    fn uses(steps: &[Value]) -> Vec<String> {
        steps
            .iter()
            .filter_map(|s| s.get("uses").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn creates_from_nvmrc() {
        let dir = repo(&[(".nvmrc", "20.0.0\n")]);
        let plan = plan(dir.path(), &SetupOptions::default()).unwrap();
        assert_eq!(plan.outcome, SetupOutcome::Created);
        assert!(plan.path.ends_with(".github/workflows/copilot-setup-steps.yml"));

        let content = plan.content.clone().unwrap();
        let steps = steps(&content);
        assert_eq!(uses(&steps), vec!["actions/checkout@v4", "actions/setup-node@v4"]);
        assert_eq!(steps[1]["with"]["node-version-file"], ".nvmrc");

        assert!(apply(&plan, false).unwrap());
        assert_eq!(std::fs::read_to_string(&plan.path).unwrap(), content);
    }

    #[test]
    fn second_run_is_unchanged() {
        let dir = repo(&[(".nvmrc", "20\n"), ("package-lock.json", "{}"), ("package.json", "{}")]);
        let first = plan(dir.path(), &SetupOptions::default()).unwrap();
        apply(&first, false).unwrap();
        let before = std::fs::read(&first.path).unwrap();

        let second = plan(dir.path(), &SetupOptions::default()).unwrap();
        assert_eq!(second.outcome, SetupOutcome::Unchanged);
        assert!(second.content.is_none());
        assert!(!apply(&second, false).unwrap());
        assert_eq!(std::fs::read(&first.path).unwrap(), before);
    }

    #[test]
    fn update_then_unchanged_without_drift() {
        let existing = "\
name: Copilot Setup Steps
on: workflow_dispatch
jobs:
  copilot-setup-steps:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
";
        let dir = repo(&[
            (".github/workflows/copilot-setup-steps.yml", existing),
            (".nvmrc", "20\n"),
            ("package.json", "{}"),
        ]);
        let first = plan(dir.path(), &SetupOptions::default()).unwrap();
        assert_eq!(first.outcome, SetupOutcome::Updated);
        assert!(apply(&first, false).unwrap());
        let written = std::fs::read(&first.path).unwrap();
        assert_eq!(written, first.content.clone().unwrap().into_bytes());

        let second = plan(dir.path(), &SetupOptions::default()).unwrap();
        assert_eq!(second.outcome, SetupOutcome::Unchanged);
        assert!(second.added.is_empty());
        assert!(!apply(&second, false).unwrap());
        assert_eq!(std::fs::read(&first.path).unwrap(), written);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = repo(&[(".python-version", "3.12\n")]);
        let plan = plan(dir.path(), &SetupOptions::default()).unwrap();
        assert!(!apply(&plan, true).unwrap());
        assert!(!plan.path.exists());
        assert!(plan.content.unwrap().contains("actions/setup-python@v5"));
    }

    #[test]
    fn updates_existing_workflow_with_missing_steps() {
        let existing = "\
name: Mine
on: workflow_dispatch
jobs:
  copilot-setup-steps:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
";
        let dir = repo(&[
            (".github/workflows/copilot-setup-steps.yml", existing),
            (".nvmrc", "20\n"),
        ]);
        let plan = plan(dir.path(), &SetupOptions::default()).unwrap();
        assert_eq!(plan.outcome, SetupOutcome::Updated);
        assert_eq!(plan.method, Some(UpdateMethod::Spliced));
        assert_eq!(plan.added.len(), 1);
        let content = plan.content.unwrap();
        assert!(content.starts_with(existing));
        assert_eq!(steps(&content).len(), 2);
    }

    #[test]
    fn yaml_spelling_is_updated_in_place() {
        let existing = "jobs:\n  a:\n    steps:\n      - uses: actions/setup-node@v3\n";
        let dir = repo(&[
            (".github/workflows/copilot-setup-steps.yaml", existing),
            (".nvmrc", "20\n"),
        ]);
        let plan = plan(dir.path(), &SetupOptions::default()).unwrap();
        assert!(plan.path.ends_with("copilot-setup-steps.yaml"));
        assert_eq!(plan.outcome, SetupOutcome::Unchanged);
    }

    #[test]
    fn workflow_candidates_take_precedence() {
        let ci = "\
jobs:
  test:
    steps:
      - uses: actions/setup-node@v4
        with:
          node-version: 18
";
        let dir = repo(&[(".github/workflows/ci.yml", ci), (".nvmrc", "20\n")]);
        let plan = plan(dir.path(), &SetupOptions::default()).unwrap();
        let nodes: Vec<_> = plan
            .candidates
            .iter()
            .filter(|c| c.action == "actions/setup-node")
            .collect();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].config.as_ref().unwrap()["node-version"], "18");
        let steps = steps(plan.content.as_deref().unwrap());
        assert_eq!(steps[1]["with"]["node-version"], "18");
    }

    #[test]
    fn mise_suppresses_runtimes_and_installers() {
        let dir = repo(&[
            ("mise.toml", "[tools]\nnode = \"20\"\n"),
            (".nvmrc", "20\n"),
            ("package.json", "{}"),
        ]);
        let plan = plan(dir.path(), &SetupOptions::default()).unwrap();
        let content = plan.content.unwrap();
        let steps = steps(&content);
        assert_eq!(uses(&steps), vec!["actions/checkout@v4", "jdx/mise-action@v2"]);
        assert!(!content.contains("npm ci"));
    }

    #[test]
    fn pinned_mode_uses_static_pins() {
        let dir = repo(&[(".nvmrc", "20\n")]);
        let options = SetupOptions {
            version_mode: version_mode_for(PinMode::Pinned, Vec::new()),
            ..Default::default()
        };
        let content = plan(dir.path(), &options).unwrap().content.unwrap();
        assert!(content.contains(
            "uses: actions/setup-node@49933ea5288caeca8642d1e84afbd3f7d6820020 # v4.4.0"
        ));
    }

    #[test]
    fn resolved_pins_override_static_ones() {
        let resolved = vec![ResolvedVersion {
            action: "actions/checkout".to_string(),
            sha: "deadbeef".to_string(),
            version_tag: "v4.9.9".to_string(),
        }];
        let VersionMode::Pinned(pins) = version_mode_for(PinMode::Pinned, resolved) else {
            panic!("expected pinned mode");
        };
        let checkout: Vec<_> = pins.iter().filter(|p| p.action == "actions/checkout").collect();
        assert_eq!(checkout.len(), 1);
        assert_eq!(checkout[0].sha, "deadbeef");
    }
}
