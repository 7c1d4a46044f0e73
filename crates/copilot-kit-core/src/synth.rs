//! Render a complete `copilot-setup-steps` workflow from candidates.
//!
//! The document is emitted as text rather than through a serializer so that
//! pinned refs can carry their tag as a trailing comment.

use crate::candidate::SetupStepCandidate;
use crate::pins::{self, ResolvedVersion};
use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

pub const DEFAULT_WORKFLOW_NAME: &str = "Copilot Setup Steps";
pub const JOB_ID: &str = "copilot-setup-steps";
pub const VERIFY_STEP_NAME: &str = "Verify development environment";

/// Step indentation inside a freshly rendered document.
const STEP_INDENT: usize = 6;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How `uses:` refs are written. Exactly one mode applies per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionMode {
    /// `action@v4` (or the candidate's own version).
    #[default]
    Floating,
    /// `action@RESOLVE_VERSION` for a later resolution pass.
    Placeholder,
    /// `action@<sha>  # <tag>` where a pin exists, floating otherwise.
    Pinned(Vec<ResolvedVersion>),
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub name: String,
    pub runner: String,
    pub timeout_minutes: u32,
    pub branches: Vec<String>,
    /// Repository-relative path of the workflow file itself.
    pub self_path: String,
    pub version_mode: VersionMode,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_WORKFLOW_NAME.to_string(),
            runner: "ubuntu-latest".to_string(),
            timeout_minutes: 30,
            branches: vec!["main".to_string()],
            self_path: ".github/workflows/copilot-setup-steps.yml".to_string(),
            version_mode: VersionMode::Floating,
        }
    }
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

static PLAIN_REF_RE: OnceLock<Regex> = OnceLock::new();

fn plain_ref_re() -> &'static Regex {
    PLAIN_REF_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._/@-]+$").unwrap())
}

/// A single-line YAML scalar, quoted only when YAML requires it.
pub fn scalar(value: &str) -> String {
    match serde_yaml::to_string(value) {
        Ok(s) if !s.trim_end().contains('\n') => s.trim_end().to_string(),
        _ => format!("{value:?}"),
    }
}

/// The `uses:` value and optional trailing comment for `action`.
pub fn render_uses(action: &str, version: Option<&str>, mode: &VersionMode) -> (String, Option<String>) {
    let id = pins::action_identity(action);
    let floating = || {
        let tag = version
            .map(str::to_string)
            .or_else(|| pins::floating_tag(id));
        match tag {
            Some(t) => format!("{id}@{t}"),
            None => id.to_string(),
        }
    };
    let (value, comment) = match mode {
        VersionMode::Floating => (floating(), None),
        VersionMode::Placeholder => (format!("{id}@{}", pins::RESOLVE_PLACEHOLDER), None),
        VersionMode::Pinned(resolved) => match resolved.iter().find(|r| r.action == id) {
            Some(r) => (format!("{id}@{}", r.sha), Some(r.version_tag.clone())),
            None => (floating(), None),
        },
    };
    let value = if plain_ref_re().is_match(&value) {
        value
    } else {
        scalar(&value)
    };
    (value, comment)
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn uses_line(action: &str, version: Option<&str>, mode: &VersionMode) -> String {
    let (value, comment) = render_uses(action, version, mode);
    match comment {
        Some(tag) => format!("  uses: {value} # {tag}"),
        None => format!("  uses: {value}"),
    }
}

fn push_run(lines: &mut Vec<String>, command: &str) {
    if command.contains('\n') {
        lines.push("  run: |".to_string());
        for line in command.trim_end().lines() {
            if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("    {line}"));
            }
        }
    } else {
        lines.push(format!("  run: {}", scalar(command)));
    }
}

/// Lines of one step, the first starting with `- `, with no base indent.
pub fn render_step(candidate: &SetupStepCandidate, mode: &VersionMode) -> Vec<String> {
    let mut lines = vec![format!("- name: {}", scalar(&candidate.display_name()))];
    if candidate.is_action() {
        lines.push(uses_line(&candidate.action, candidate.version.as_deref(), mode));
        if let Some(config) = candidate.config.as_ref().filter(|c| !c.is_empty()) {
            lines.push("  with:".to_string());
            for (k, v) in config {
                lines.push(format!("    {}: {}", scalar(k), scalar(v)));
            }
        }
    } else if let Some(run) = &candidate.run {
        push_run(&mut lines, run);
    }
    lines
}

fn checkout_step(mode: &VersionMode) -> Vec<String> {
    vec![
        format!("- name: {}", scalar(&pins::action_display_name(pins::CHECKOUT_ACTION))),
        uses_line(pins::CHECKOUT_ACTION, None, mode),
    ]
}

/// Version checks for the trailing verification step, in step order.
pub fn verification_commands(candidates: &[&SetupStepCandidate]) -> Vec<String> {
    let mut commands: Vec<String> = Vec::new();
    for c in candidates {
        let command = if c.is_action() {
            pins::version_command(&c.action).map(str::to_string)
        } else {
            c.run.as_deref().and_then(tool_version_command)
        };
        if let Some(cmd) = command {
            if !commands.contains(&cmd) {
                commands.push(cmd);
            }
        }
    }
    commands
}

fn tool_version_command(run: &str) -> Option<String> {
    let tool = run.split_whitespace().next()?;
    match tool {
        "npm" | "yarn" | "pnpm" | "pip" | "poetry" | "bundle" => Some(format!("{tool} --version")),
        "go" => Some("go version".to_string()),
        _ => None,
    }
}

fn verify_step(candidates: &[&SetupStepCandidate]) -> Vec<String> {
    let mut commands = verification_commands(candidates);
    if commands.is_empty() {
        commands.push("echo \"Environment ready\"".to_string());
    }
    let mut lines = vec![format!("- name: {VERIFY_STEP_NAME}")];
    push_run(&mut lines, &format!("{}\n", commands.join("\n")));
    lines
}

/// Candidates in render order: mise first, then the rest in input order.
pub fn order_candidates(candidates: &[SetupStepCandidate]) -> Vec<&SetupStepCandidate> {
    let mut ordered: Vec<&SetupStepCandidate> = candidates.iter().collect();
    ordered.sort_by_key(|c| !c.is_mise());
    ordered
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

pub fn render(candidates: &[SetupStepCandidate], options: &WorkflowOptions) -> String {
    let ordered = order_candidates(candidates);
    let mut out = String::new();

    let _ = writeln!(out, "name: {}", scalar(&options.name));
    out.push('\n');
    out.push_str("on:\n");
    out.push_str("  workflow_dispatch: {}\n");
    if !options.branches.is_empty() {
        for event in ["push", "pull_request"] {
            let _ = writeln!(out, "  {event}:");
            out.push_str("    branches:\n");
            for branch in &options.branches {
                let _ = writeln!(out, "      - {}", scalar(branch));
            }
            out.push_str("    paths:\n");
            let _ = writeln!(out, "      - {}", scalar(&options.self_path));
        }
    }
    out.push('\n');
    out.push_str("permissions:\n");
    out.push_str("  contents: read\n");
    out.push_str("  id-token: write\n");
    out.push('\n');
    out.push_str("jobs:\n");
    let _ = writeln!(out, "  {JOB_ID}:");
    let _ = writeln!(out, "    runs-on: {}", scalar(&options.runner));
    let _ = writeln!(out, "    timeout-minutes: {}", options.timeout_minutes);
    out.push_str("    steps:\n");

    let mode = &options.version_mode;
    let mut steps = vec![checkout_step(mode)];
    steps.extend(ordered.iter().map(|c| render_step(c, mode)));
    steps.push(verify_step(&ordered));

    let indent = " ".repeat(STEP_INDENT);
    for step in steps {
        for line in step {
            if line.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "{indent}{line}");
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CandidateSource;
    use serde_yaml::Value;

    fn node() -> SetupStepCandidate {
        SetupStepCandidate::action("actions/setup-node", CandidateSource::VersionFile)
            .with_config("node-version-file", ".nvmrc")
    }

    fn mise() -> SetupStepCandidate {
        SetupStepCandidate::action("jdx/mise-action", CandidateSource::VersionFile)
    }

    fn npm_ci() -> SetupStepCandidate {
        SetupStepCandidate::run("npm ci", "Install dependencies", CandidateSource::VersionFile)
    }

    fn steps_of(yaml: &str) -> Vec<Value> {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        doc["jobs"][JOB_ID]["steps"].as_sequence().unwrap().clone()
    }

    fn uses_of(step: &Value) -> Option<&str> {
        step.get("uses").and_then(Value::as_str)
    }

    #[test]
    fn renders_a_parseable_workflow() {
        let yaml = render(&[node(), npm_ci()], &WorkflowOptions::default());
        let doc: Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(doc["name"], "Copilot Setup Steps");
        assert_eq!(doc["permissions"]["contents"], "read");
        assert_eq!(doc["permissions"]["id-token"], "write");
        let job = &doc["jobs"][JOB_ID];
        assert_eq!(job["runs-on"], "ubuntu-latest");
        assert_eq!(job["timeout-minutes"], 30);
        assert_eq!(
            doc["on"]["push"]["paths"][0],
            ".github/workflows/copilot-setup-steps.yml"
        );
        assert_eq!(doc["on"]["pull_request"]["branches"][0], "main");
        assert!(doc["on"]["workflow_dispatch"].is_mapping());

        let steps = steps_of(&yaml);
        assert_eq!(steps.len(), 4);
        assert_eq!(uses_of(&steps[0]), Some("actions/checkout@v4"));
        assert_eq!(uses_of(&steps[1]), Some("actions/setup-node@v4"));
        assert_eq!(steps[1]["with"]["node-version-file"], ".nvmrc");
        assert_eq!(steps[2]["run"], "npm ci");
        assert_eq!(steps[3]["name"], VERIFY_STEP_NAME);
        let verify = steps[3]["run"].as_str().unwrap();
        assert!(verify.contains("node --version"));
        assert!(verify.contains("npm --version"));
    }

    #[test]
    fn checkout_first_and_mise_before_everything_else() {
        let python = SetupStepCandidate::action("actions/setup-python", CandidateSource::Workflow);
        let yaml = render(&[npm_ci(), node(), python, mise()], &WorkflowOptions::default());
        let steps = steps_of(&yaml);
        let uses: Vec<_> = steps.iter().map(|s| uses_of(s).unwrap_or("")).collect();
        assert!(uses[0].starts_with("actions/checkout@"));
        assert!(uses[1].starts_with("jdx/mise-action@"));
        assert_eq!(steps[2]["run"], "npm ci");
        assert!(uses[3].starts_with("actions/setup-node@"));
        assert!(uses[4].starts_with("actions/setup-python@"));
        assert_eq!(steps[5]["name"], VERIFY_STEP_NAME);
    }

    #[test]
    fn placeholder_mode_defers_every_ref() {
        let options = WorkflowOptions {
            version_mode: VersionMode::Placeholder,
            ..Default::default()
        };
        let yaml = render(&[node(), mise()], &options);
        assert!(yaml.contains("uses: actions/checkout@RESOLVE_VERSION"));
        assert!(yaml.contains("uses: actions/setup-node@RESOLVE_VERSION"));
        assert!(yaml.contains("uses: jdx/mise-action@RESOLVE_VERSION"));
    }

    #[test]
    fn pinned_mode_puts_tag_in_a_comment() {
        let options = WorkflowOptions {
            version_mode: VersionMode::Pinned(vec![ResolvedVersion {
                action: "actions/checkout".to_string(),
                sha: "abc123".to_string(),
                version_tag: "v4.1.0".to_string(),
            }]),
            ..Default::default()
        };
        let yaml = render(&[node()], &options);
        assert!(yaml.contains("uses: actions/checkout@abc123"));
        assert!(yaml.contains("# v4.1.0"));
        assert!(!yaml.contains("\"actions/checkout@abc123"));
        assert!(!yaml.contains("'actions/checkout@abc123"));
        // unresolved actions fall back to the floating tag
        assert!(yaml.contains("uses: actions/setup-node@v4"));

        let steps = steps_of(&yaml);
        assert_eq!(uses_of(&steps[0]), Some("actions/checkout@abc123"));
    }

    #[test]
    fn unknown_actions_render_bare() {
        let custom = SetupStepCandidate::action("my-org/setup-toolchain", CandidateSource::Workflow);
        let yaml = render(&[custom], &WorkflowOptions::default());
        assert!(yaml.contains("uses: my-org/setup-toolchain\n"));
        assert!(yaml.contains("name: Setup toolchain"));
    }

    #[test]
    fn candidate_version_overrides_floating_tag() {
        let mut node = node();
        node.version = Some("v3".to_string());
        let yaml = render(&[node], &WorkflowOptions::default());
        assert!(yaml.contains("uses: actions/setup-node@v3"));
    }

    #[test]
    fn numeric_looking_values_are_quoted() {
        let ruby = SetupStepCandidate::action("ruby/setup-ruby", CandidateSource::VersionFile)
            .with_config("ruby-version", "3.3");
        let yaml = render(&[ruby], &WorkflowOptions::default());
        let steps = steps_of(&yaml);
        assert_eq!(steps[1]["with"]["ruby-version"], "3.3");
    }

    #[test]
    fn no_known_tools_verifies_with_echo() {
        let yaml = render(&[], &WorkflowOptions::default());
        let steps = steps_of(&yaml);
        assert_eq!(steps.len(), 2);
        assert!(steps[1]["run"].as_str().unwrap().contains("Environment ready"));
    }

    #[test]
    fn no_branches_means_dispatch_only() {
        let options = WorkflowOptions {
            branches: vec![],
            ..Default::default()
        };
        let doc: Value = serde_yaml::from_str(&render(&[], &options)).unwrap();
        assert!(doc["on"].get("push").is_none());
        assert!(doc["on"].get("workflow_dispatch").is_some());
    }

    #[test]
    fn multi_line_run_uses_block_scalar() {
        let setup = SetupStepCandidate::run("make deps\nmake tools", "Tools", CandidateSource::Workflow);
        let yaml = render(&[setup], &WorkflowOptions::default());
        let steps = steps_of(&yaml);
        assert_eq!(steps[1]["run"], "make deps\nmake tools\n");
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = render(&[node(), npm_ci()], &WorkflowOptions::default());
        let b = render(&[node(), npm_ci()], &WorkflowOptions::default());
        assert_eq!(a, b);
    }
}
