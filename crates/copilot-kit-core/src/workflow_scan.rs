//! Discover setup actions already used by the repository's CI workflows.

use crate::candidate::{CandidateSource, SetupStepCandidate};
use crate::error::{KitError, Result};
use crate::io;
use crate::pins::action_identity;
use regex::Regex;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Actions recognised as setup actions out of the box.
pub const DEFAULT_SETUP_ACTION_PATTERNS: &[&str] = &[
    r"^actions/setup-[a-z0-9-]+$",
    r"^ruby/setup-ruby$",
    r"^jdx/mise-action$",
    r"^pnpm/action-setup$",
    r"^oven-sh/setup-bun$",
    r"^astral-sh/setup-uv$",
    r"^dtolnay/rust-toolchain$",
];

// ---------------------------------------------------------------------------
// Allowlist
// ---------------------------------------------------------------------------

/// Pattern-based allowlist of action identities that count as setup steps.
#[derive(Debug, Clone)]
pub struct SetupActionAllowlist {
    patterns: Vec<Regex>,
}

impl Default for SetupActionAllowlist {
    fn default() -> Self {
        let patterns = DEFAULT_SETUP_ACTION_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("built-in setup action pattern"))
            .collect();
        Self { patterns }
    }
}

impl SetupActionAllowlist {
    /// The default patterns plus `extra`.
    pub fn with_extra(extra: &[String]) -> Result<Self> {
        let mut allowlist = Self::default();
        for pattern in extra {
            let re = Regex::new(pattern).map_err(|e| KitError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            allowlist.patterns.push(re);
        }
        Ok(allowlist)
    }

    pub fn matches(&self, uses: &str) -> bool {
        let id = action_identity(uses);
        self.patterns.iter().any(|re| re.is_match(id))
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Collect setup-action candidates from every workflow in `workflows_dir`
/// except the files named in `exclude`.
///
/// A file that cannot be read or parsed is skipped. The result holds one
/// candidate per action identity; the first occurrence wins.
pub fn scan(
    workflows_dir: &Path,
    allowlist: &SetupActionAllowlist,
    exclude: &[String],
) -> Vec<SetupStepCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for path in io::list_files_with_extensions(workflows_dir, &["yml", "yaml"]) {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if exclude.iter().any(|e| *e == file_name) {
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable workflow");
                continue;
            }
        };
        let doc: Value = match serde_yaml::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping malformed workflow");
                continue;
            }
        };
        for candidate in candidates_in(&doc, allowlist) {
            if seen.insert(candidate.identity()) {
                debug!(file = %file_name, action = %candidate.action, "found setup action");
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn candidates_in(doc: &Value, allowlist: &SetupActionAllowlist) -> Vec<SetupStepCandidate> {
    let Some(jobs) = doc.get("jobs").and_then(Value::as_mapping) else {
        return Vec::new();
    };
    jobs.values()
        .filter_map(|job| job.get("steps").and_then(Value::as_sequence))
        .flatten()
        .filter_map(|step| {
            let uses = step.get("uses").and_then(Value::as_str)?;
            if !allowlist.matches(uses) {
                return None;
            }
            let mut candidate = SetupStepCandidate::action(uses, CandidateSource::Workflow);
            candidate.name = step.get("name").and_then(Value::as_str).map(str::to_string);
            candidate.config = step
                .get("with")
                .and_then(Value::as_mapping)
                .map(stringify_mapping)
                .filter(|m| !m.is_empty());
            Some(candidate)
        })
        .collect()
}

fn stringify_mapping(mapping: &serde_yaml::Mapping) -> BTreeMap<String, String> {
    mapping
        .iter()
        .filter_map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
