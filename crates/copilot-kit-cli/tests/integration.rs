#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_yaml::Value;
use tempfile::TempDir;

const WORKFLOW: &str = ".github/workflows/copilot-setup-steps.yml";

fn kit(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("copilot-kit").unwrap();
    cmd.current_dir(dir.path())
        .env("COPILOT_KIT_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn read(dir: &TempDir, rel: &str) -> String {
    std::fs::read_to_string(dir.path().join(rel)).unwrap()
}

fn steps(content: &str) -> Vec<Value> {
    let doc: Value = serde_yaml::from_str(content).unwrap();
    let jobs = doc["jobs"].as_mapping().unwrap();
    let (_, job) = jobs.iter().next().unwrap();
    job["steps"].as_sequence().unwrap().clone()
}

// ---------------------------------------------------------------------------
// setup-steps
// ---------------------------------------------------------------------------

#[test]
fn setup_steps_creates_workflow() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".nvmrc", "20.0.0\n");
    kit(&dir)
        .arg("setup-steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created .github/workflows/copilot-setup-steps.yml"));

    let steps = steps(&read(&dir, WORKFLOW));
    assert_eq!(steps[0]["uses"], "actions/checkout@v4");
    assert_eq!(steps[1]["uses"], "actions/setup-node@v4");
    assert_eq!(steps[1]["with"]["node-version-file"], ".nvmrc");
}

#[test]
fn setup_steps_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".python-version", "3.12\n");
    write(&dir, "requirements.txt", "requests\n");
    kit(&dir).arg("setup-steps").assert().success();
    let first = read(&dir, WORKFLOW);

    kit(&dir)
        .arg("setup-steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));
    assert_eq!(read(&dir, WORKFLOW), first);
}

#[test]
fn setup_steps_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    write(&dir, "go.mod", "module example.com/x\n");
    write(&dir, ".go-version", "1.22\n");
    kit(&dir)
        .args(["setup-steps", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("actions/setup-go@v5"));
    assert!(!dir.path().join(WORKFLOW).exists());
}

#[test]
fn setup_steps_update_preserves_custom_fields() {
    let dir = TempDir::new().unwrap();
    let existing = "\
# Owned by the platform team
name: Custom Copilot Setup
on: workflow_dispatch
permissions:
  contents: read
jobs:
  copilot-setup-steps:
    runs-on: self-hosted  # big runner
    timeout-minutes: 15
    steps:
      - uses: actions/checkout@v4
      - name: Verify tools
        run: node --version
";
    write(&dir, WORKFLOW, existing);
    write(&dir, ".nvmrc", "20\n");

    kit(&dir)
        .arg("setup-steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"));

    let content = read(&dir, WORKFLOW);
    assert!(content.starts_with("# Owned by the platform team\nname: Custom Copilot Setup\n"));
    assert!(content.contains("runs-on: self-hosted  # big runner\n"));
    assert!(content.ends_with("      - name: Verify tools\n        run: node --version\n"));
    let steps = steps(&content);
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[1]["uses"], "actions/setup-node@v4");
}

#[test]
fn setup_steps_update_then_up_to_date() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        WORKFLOW,
        "name: Copilot Setup Steps\non: workflow_dispatch\njobs:\n  copilot-setup-steps:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n",
    );
    write(&dir, ".nvmrc", "20\n");
    write(&dir, "package.json", "{}");

    let output = kit(&dir).args(["--json", "setup-steps"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["outcome"], "updated");
    assert_eq!(value["method"], "spliced");
    let updated = read(&dir, WORKFLOW);

    kit(&dir)
        .arg("setup-steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));
    assert_eq!(read(&dir, WORKFLOW), updated);
}

#[test]
fn setup_steps_workflow_action_beats_version_file() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        ".github/workflows/ci.yml",
        "jobs:\n  test:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/setup-node@v4\n        with:\n          node-version: 18\n",
    );
    write(&dir, ".nvmrc", "20\n");
    kit(&dir).arg("setup-steps").assert().success();
    let steps = steps(&read(&dir, WORKFLOW));
    let nodes: Vec<_> = steps
        .iter()
        .filter(|s| {
            s["uses"]
                .as_str()
                .is_some_and(|u| u.starts_with("actions/setup-node"))
        })
        .collect();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["with"]["node-version"], "18");
}

#[test]
fn setup_steps_mise_only() {
    let dir = TempDir::new().unwrap();
    write(&dir, "mise.toml", "[tools]\nnode = \"20\"\n");
    write(&dir, ".nvmrc", "20\n");
    kit(&dir).arg("setup-steps").assert().success();
    let content = read(&dir, WORKFLOW);
    assert!(content.contains("jdx/mise-action@v2"));
    assert!(!content.contains("actions/setup-node"));
}

#[test]
fn setup_steps_placeholder_and_pin() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".nvmrc", "20\n");
    kit(&dir)
        .args(["setup-steps", "--dry-run", "--placeholder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("actions/setup-node@RESOLVE_VERSION"));
    kit(&dir)
        .args(["setup-steps", "--dry-run", "--pin"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "actions/checkout@11bd71901bbe5b1630ceea73d27597364c9af683 # v4.2.2",
        ));
    kit(&dir)
        .args(["setup-steps", "--placeholder", "--pin"])
        .assert()
        .failure();
}

#[test]
fn setup_steps_json_output() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".nvmrc", "20\n");
    let output = kit(&dir)
        .args(["--json", "setup-steps", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["outcome"], "created");
    assert_eq!(value["written"], false);
    assert_eq!(value["path"], WORKFLOW);
}

// ---------------------------------------------------------------------------
// lint
// ---------------------------------------------------------------------------

#[test]
fn lint_passes_on_valid_files() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        ".github/agents/reviewer.md",
        "---\nname: reviewer\ndescription: Reviews pull requests\n---\nReview carefully.\n",
    );
    write(
        &dir,
        ".github/skills/release/SKILL.md",
        "---\nname: release\ndescription: Cut a release\n---\nSteps.\n",
    );
    kit(&dir)
        .arg("lint")
        .assert()
        .success()
        .stdout(predicate::str::contains("No problems found"));
}

#[test]
fn lint_fails_on_errors() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        ".github/skills/release/SKILL.md",
        "---\nname: shipping\ndescription: Cut a release\n---\nSteps.\n",
    );
    kit(&dir)
        .arg("lint")
        .assert()
        .failure()
        .stdout(predicate::str::contains("name-mismatch"))
        .stderr(predicate::str::contains("lint found 1 error(s)"));
}

// ---------------------------------------------------------------------------
// instructions
// ---------------------------------------------------------------------------

#[test]
fn instructions_strict_fails_on_uncovered_language() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".github/copilot-instructions.md", "Be concise.\n");
    write(&dir, "src/main.rs", "fn main() {}\n");
    kit(&dir)
        .arg("instructions")
        .assert()
        .success()
        .stdout(predicate::str::contains("uncovered-language"));
    kit(&dir).args(["instructions", "--strict"]).assert().failure();

    write(
        &dir,
        ".github/instructions/rust.instructions.md",
        "---\napplyTo: \"**/*.rs\"\n---\nPrefer Result.\n",
    );
    kit(&dir).args(["instructions", "--strict"]).assert().success();
}

// ---------------------------------------------------------------------------
// ruleset
// ---------------------------------------------------------------------------

#[test]
fn ruleset_requires_authentication() {
    let dir = TempDir::new().unwrap();
    kit(&dir)
        .args(["ruleset", "--dry-run"])
        .env("GITHUB_TOKEN", "invalid")
        .env("GITHUB_API_URL", "http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not authenticated"));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_show_prints_defaults() {
    let dir = TempDir::new().unwrap();
    kit(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runner: ubuntu-latest"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".github/copilot-kit.yaml", "setup:\n  timeout_minutes: 0\n");
    kit(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("setup.timeout_minutes must be greater than 0"));
}

#[test]
fn config_validate_clean() {
    let dir = TempDir::new().unwrap();
    kit(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}
