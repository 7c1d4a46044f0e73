//! Frontmatter checks for custom agents (`.github/agents/*.md`) and skills
//! (`.github/skills/<name>/SKILL.md`).

use crate::config::{LintConfig, WarnLevel};
use crate::frontmatter;
use crate::io;
use crate::paths;
use serde::Serialize;
use serde_yaml::Value;
use std::path::Path;
use tracing::{debug, warn};

pub const AGENT_KEYS: &[&str] = &[
    "name",
    "description",
    "tools",
    "model",
    "target",
    "handoffs",
    "mcp-servers",
    "argument-hint",
];

pub const SKILL_KEYS: &[&str] = &["name", "description", "license", "allowed-tools", "metadata"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Repository-relative path, forward slashes.
    pub path: String,
    pub level: WarnLevel,
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LintReport {
    pub files_checked: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    pub fn error_count(&self) -> usize {
        self.count(WarnLevel::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(WarnLevel::Warning)
    }

    fn count(&self, level: WarnLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Agent,
    Skill,
}

impl FileKind {
    fn known_keys(self) -> &'static [&'static str] {
        match self {
            FileKind::Agent => AGENT_KEYS,
            FileKind::Skill => SKILL_KEYS,
        }
    }

    fn tools_key(self) -> &'static str {
        match self {
            FileKind::Agent => "tools",
            FileKind::Skill => "allowed-tools",
        }
    }
}

// ---------------------------------------------------------------------------
// Single file
// ---------------------------------------------------------------------------

/// Check one file's content. For skills, `expected_name` is the name of the
/// directory that holds `SKILL.md`.
pub fn lint_content(
    path: &str,
    content: &str,
    kind: FileKind,
    expected_name: Option<&str>,
    config: &LintConfig,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut push = |level, rule: &str, message: String| {
        out.push(Diagnostic {
            path: path.to_string(),
            level,
            rule: rule.to_string(),
            message,
        })
    };

    let Some(split) = frontmatter::split(content) else {
        push(
            WarnLevel::Error,
            "missing-frontmatter",
            "file does not start with a `---` frontmatter block".to_string(),
        );
        return out;
    };

    let value: Value = if split.yaml.trim().is_empty() {
        Value::Null
    } else {
        match serde_yaml::from_str(split.yaml) {
            Ok(v) => v,
            Err(e) => {
                push(WarnLevel::Error, "invalid-yaml", format!("frontmatter is not valid YAML: {e}"));
                return out;
            }
        }
    };
    let Some(mapping) = value.as_mapping() else {
        push(
            WarnLevel::Error,
            "not-a-mapping",
            "frontmatter must be a mapping of keys to values".to_string(),
        );
        return out;
    };

    match frontmatter::string_field(&value, "description").map(str::trim) {
        None | Some("") => push(
            WarnLevel::Error,
            "missing-description",
            "`description` is required".to_string(),
        ),
        Some(d) if d.chars().count() > config.max_description_length => push(
            WarnLevel::Warning,
            "description-too-long",
            format!(
                "`description` is {} characters; the limit is {}",
                d.chars().count(),
                config.max_description_length
            ),
        ),
        Some(_) => {}
    }

    match (mapping.get("name"), kind) {
        (None, FileKind::Skill) => push(
            WarnLevel::Error,
            "missing-name",
            "`name` is required".to_string(),
        ),
        (None, FileKind::Agent) => {}
        (Some(Value::String(name)), _) => {
            if !paths::is_valid_name(name) {
                push(
                    WarnLevel::Error,
                    "invalid-name",
                    format!("`name` '{name}' must be lowercase words joined by hyphens, at most 64 characters"),
                );
            }
            if let (FileKind::Skill, Some(dir)) = (kind, expected_name) {
                if name != dir {
                    push(
                        WarnLevel::Error,
                        "name-mismatch",
                        format!("`name` '{name}' does not match directory '{dir}'"),
                    );
                }
            }
        }
        (Some(_), _) => push(
            WarnLevel::Error,
            "invalid-name",
            "`name` must be a string".to_string(),
        ),
    }

    let tools_key = kind.tools_key();
    if let Some(tools) = mapping.get(tools_key) {
        let ok = match tools {
            Value::String(_) => true,
            Value::Sequence(items) => items.iter().all(Value::is_string),
            _ => false,
        };
        if !ok {
            push(
                WarnLevel::Error,
                "invalid-tools",
                format!("`{tools_key}` must be a string or a list of strings"),
            );
        }
    }

    for key in mapping.keys() {
        let known = key.as_str().is_some_and(|k| kind.known_keys().contains(&k));
        if !known {
            let shown = key.as_str().map(str::to_string).unwrap_or_else(|| format!("{key:?}"));
            push(WarnLevel::Warning, "unknown-key", format!("unknown frontmatter key `{shown}`"));
        }
    }

    if split.body.trim().is_empty() {
        push(
            WarnLevel::Warning,
            "empty-body",
            "no instructions after the frontmatter".to_string(),
        );
    }

    out
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Lint every agent and skill under `root`.
pub fn lint(root: &Path, config: &LintConfig) -> LintReport {
    let mut report = LintReport::default();

    for path in io::list_files_with_extensions(&paths::agents_dir(root), &["md"]) {
        let rel = paths::relative_display(root, &path);
        check_file(&mut report, &path, &rel, FileKind::Agent, None, config);
    }

    for dir in skill_dirs(&paths::skills_dir(root)) {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = dir.join(paths::SKILL_FILE);
        let rel = paths::relative_display(root, &path);
        if !path.is_file() {
            report.diagnostics.push(Diagnostic {
                path: rel,
                level: WarnLevel::Error,
                rule: "missing-frontmatter".to_string(),
                message: format!("skill directory '{name}' has no {}", paths::SKILL_FILE),
            });
            continue;
        }
        check_file(&mut report, &path, &rel, FileKind::Skill, Some(&name), config);
    }

    debug!(
        files = report.files_checked,
        errors = report.error_count(),
        warnings = report.warning_count(),
        "lint finished"
    );
    report
}

fn check_file(
    report: &mut LintReport,
    path: &Path,
    rel: &str,
    kind: FileKind,
    expected_name: Option<&str>,
    config: &LintConfig,
) {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            report.files_checked += 1;
            report
                .diagnostics
                .extend(lint_content(rel, &content, kind, expected_name, config));
        }
        Err(e) => warn!(file = %rel, error = %e, "skipping unreadable file"),
    }
}

fn skill_dirs(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
