//! Custom instruction coverage: which source languages in the repository
//! are targeted by a path-specific instructions file.

use crate::config::WarnLevel;
use crate::frontmatter;
use crate::io;
use crate::lint::Diagnostic;
use crate::paths;
use glob::Pattern;
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const INSTRUCTIONS_SUFFIX: &str = ".instructions.md";

const EXCLUDED_DIRS: &[&str] = &["node_modules", "target", "vendor", "dist", "build"];

/// Language name and the file extensions that identify it.
const LANGUAGES: &[(&str, &[&str])] = &[
    ("Rust", &["rs"]),
    ("TypeScript", &["ts", "tsx", "mts", "cts"]),
    ("JavaScript", &["js", "jsx", "mjs", "cjs"]),
    ("Python", &["py"]),
    ("Go", &["go"]),
    ("Java", &["java"]),
    ("Kotlin", &["kt", "kts"]),
    ("Ruby", &["rb"]),
    ("C#", &["cs"]),
    ("PHP", &["php"]),
    ("Swift", &["swift"]),
    ("C/C++", &["c", "h", "cc", "cpp", "cxx", "hpp", "hh"]),
];

pub fn language_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    LANGUAGES
        .iter()
        .find(|(_, exts)| exts.contains(&ext))
        .map(|(name, _)| *name)
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructionFile {
    pub path: String,
    pub apply_to: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageCoverage {
    pub language: String,
    pub files: usize,
    /// Instruction files with a pattern matching at least one file.
    pub covered_by: Vec<String>,
}

impl LanguageCoverage {
    pub fn is_covered(&self) -> bool {
        !self.covered_by.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    pub repo_instructions: bool,
    pub instruction_files: Vec<InstructionFile>,
    pub languages: Vec<LanguageCoverage>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CoverageReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == WarnLevel::Error)
    }

    /// Failing status: any error, or any warning when `strict`.
    pub fn fails(&self, strict: bool) -> bool {
        self.has_errors() || (strict && !self.diagnostics.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Source files
// ---------------------------------------------------------------------------

fn is_excluded(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || EXCLUDED_DIRS.contains(&&*name)
}

/// Repository-relative source files grouped by language.
pub fn source_files(root: &Path) -> BTreeMap<&'static str, Vec<String>> {
    let mut by_language: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(language) = language_for(entry.path()) {
            by_language
                .entry(language)
                .or_default()
                .push(paths::relative_display(root, entry.path()));
        }
    }
    by_language
}

// ---------------------------------------------------------------------------
// Instruction files
// ---------------------------------------------------------------------------

/// Split an `applyTo` value into trimmed, non-empty patterns.
pub fn parse_apply_to(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn apply_to_of(content: &str) -> Option<String> {
    let split = frontmatter::split(content)?;
    let value: Value = serde_yaml::from_str(split.yaml).ok()?;
    match value.get("applyTo")? {
        Value::String(s) => Some(s.clone()),
        Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

pub fn coverage(root: &Path) -> CoverageReport {
    let mut report = CoverageReport {
        repo_instructions: paths::repo_instructions_path(root).is_file(),
        ..Default::default()
    };
    if !report.repo_instructions {
        report.diagnostics.push(Diagnostic {
            path: paths::REPO_INSTRUCTIONS_FILE.to_string(),
            level: WarnLevel::Warning,
            rule: "missing-repo-instructions".to_string(),
            message: "no repository-wide custom instructions".to_string(),
        });
    }

    let mut compiled: Vec<(String, Vec<Pattern>)> = Vec::new();
    let files = io::list_files_with_extensions(&paths::instructions_dir(root), &["md"]);
    for path in files {
        let is_instructions = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(INSTRUCTIONS_SUFFIX));
        if !is_instructions {
            continue;
        }
        let rel = paths::relative_display(root, &path);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %rel, error = %e, "skipping unreadable instructions file");
                continue;
            }
        };

        let apply_to = apply_to_of(&content).map(|v| parse_apply_to(&v)).unwrap_or_default();
        if apply_to.is_empty() {
            report.diagnostics.push(Diagnostic {
                path: rel.clone(),
                level: WarnLevel::Warning,
                rule: "missing-apply-to".to_string(),
                message: "frontmatter has no `applyTo` patterns".to_string(),
            });
        }

        let mut patterns = Vec::new();
        for raw in &apply_to {
            match Pattern::new(raw) {
                Ok(p) => patterns.push(p),
                Err(e) => report.diagnostics.push(Diagnostic {
                    path: rel.clone(),
                    level: WarnLevel::Error,
                    rule: "invalid-glob".to_string(),
                    message: format!("invalid glob '{raw}': {e}"),
                }),
            }
        }
        compiled.push((rel.clone(), patterns));
        report.instruction_files.push(InstructionFile {
            path: rel,
            apply_to,
        });
    }

    for (language, files) in source_files(root) {
        let covered_by: Vec<String> = compiled
            .iter()
            .filter(|(_, patterns)| {
                patterns
                    .iter()
                    .any(|p| files.iter().any(|f| p.matches(f)))
            })
            .map(|(path, _)| path.clone())
            .collect();
        debug!(language, files = files.len(), covered = !covered_by.is_empty(), "language coverage");
        if covered_by.is_empty() {
            report.diagnostics.push(Diagnostic {
                path: paths::INSTRUCTIONS_DIR.to_string(),
                level: WarnLevel::Warning,
                rule: "uncovered-language".to_string(),
                message: format!(
                    "{language} ({} files) has no matching instructions file",
                    files.len()
                ),
            });
        }
        report.languages.push(LanguageCoverage {
            language: language.to_string(),
            files: files.len(),
            covered_by,
        });
    }

    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
