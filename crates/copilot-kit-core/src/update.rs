//! Add missing setup steps to an existing workflow without disturbing the
//! rest of the file.

use crate::candidate::SetupStepCandidate;
use crate::document::{self, WorkflowDocument};
use crate::synth::{self, VersionMode, WorkflowOptions};
use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, warn};

/// How the new content was produced from the existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    /// Steps inserted into the original text; every other byte kept.
    Spliced,
    /// Steps inserted into the parsed document, which was then re-emitted.
    /// Keys and values survive, comments and layout do not.
    Rewritten,
    /// The existing text is not a workflow and was replaced.
    Regenerated,
}

impl UpdateMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateMethod::Spliced => "spliced",
            UpdateMethod::Rewritten => "rewritten",
            UpdateMethod::Regenerated => "regenerated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutput {
    pub content: String,
    pub method: UpdateMethod,
}

/// Insert `missing`, in the given order, into `existing` before the
/// verification step or after the last step.
///
/// Block-style step sequences are edited in place. Other layouts of a valid
/// workflow (flow sequences, anchored or flow-mapping jobs) are edited
/// through the parsed tree. Only text without a first job carrying a
/// `steps` sequence is replaced by a freshly rendered workflow.
pub fn update(existing: &str, missing: &[SetupStepCandidate], options: &WorkflowOptions) -> UpdateOutput {
    if let Some(content) = splice(existing, missing, &options.version_mode) {
        return UpdateOutput {
            content,
            method: UpdateMethod::Spliced,
        };
    }
    if let Some(content) = rewrite(existing, missing, &options.version_mode) {
        debug!("steps layout not editable in place; re-emitted the document");
        return UpdateOutput {
            content,
            method: UpdateMethod::Rewritten,
        };
    }
    warn!("existing workflow could not be interpreted; regenerating it");
    UpdateOutput {
        content: regenerate(existing, missing, options),
        method: UpdateMethod::Regenerated,
    }
}

fn splice(existing: &str, missing: &[SetupStepCandidate], mode: &VersionMode) -> Option<String> {
    let doc = WorkflowDocument::parse(existing)?;
    let before = doc.steps().len();
    let index = doc.insertion_index();

    let rendered: Vec<Vec<String>> = missing
        .iter()
        .map(|c| synth::render_step(c, mode))
        .collect();
    let content = doc.insert_steps(index, &rendered);

    check_count(&content, before + missing.len())?;
    debug!(index, inserted = missing.len(), "spliced steps into workflow");
    Some(content)
}

fn rewrite(existing: &str, missing: &[SetupStepCandidate], mode: &VersionMode) -> Option<String> {
    let mut value: Value = serde_yaml::from_str(existing).ok()?;
    let steps = document::first_job_steps_mut(&mut value)?;
    let before = steps.len();
    let index = document::insertion_index(steps);

    let nodes = missing
        .iter()
        .map(|c| step_node(c, mode))
        .collect::<Option<Vec<_>>>()?;
    for (offset, node) in nodes.into_iter().enumerate() {
        steps.insert(index + offset, node);
    }

    let content = serde_yaml::to_string(&value).ok()?;
    check_count(&content, before + missing.len())?;
    Some(content)
}

/// A rendered step as a YAML node.
fn step_node(candidate: &SetupStepCandidate, mode: &VersionMode) -> Option<Value> {
    let text = synth::render_step(candidate, mode).join("\n");
    match serde_yaml::from_str::<Value>(&text).ok()? {
        Value::Sequence(mut items) if items.len() == 1 => items.pop(),
        _ => None,
    }
}

fn check_count(content: &str, expected: usize) -> Option<()> {
    let reparsed: Value = serde_yaml::from_str(content).ok()?;
    let after = document::first_job_steps(&reparsed)?.len();
    if after != expected {
        debug!(after, expected, "step count mismatch after update");
        return None;
    }
    Some(())
}

fn regenerate(existing: &str, missing: &[SetupStepCandidate], options: &WorkflowOptions) -> String {
    let name = serde_yaml::from_str::<Value>(existing)
        .ok()
        .and_then(|v| v.get("name").and_then(Value::as_str).map(str::to_string));
    let options = WorkflowOptions {
        name: name.unwrap_or_else(|| options.name.clone()),
        ..options.clone()
    };
    synth::render(missing, &options)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
