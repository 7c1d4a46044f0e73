//! Structural view of an existing workflow document.
//!
//! The document is interpreted twice: `serde_yaml` supplies the semantic
//! tree (jobs, the first job, its steps) and a block-structure index maps
//! the first job's `steps` sequence back to byte offsets in the original
//! text. Edits splice new step nodes in at those offsets so everything
//! outside the inserted region stays byte-identical.

use crate::pins::action_identity;
use regex::Regex;
use serde_yaml::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Semantic accessors
// ---------------------------------------------------------------------------

/// The first job's step sequence, if `doc` is shaped like a workflow.
pub fn first_job_steps(doc: &Value) -> Option<&Vec<Value>> {
    let jobs = doc.as_mapping()?.get("jobs")?.as_mapping()?;
    let (_, job) = jobs.iter().next()?;
    job.get("steps")?.as_sequence()
}

/// Mutable access to the first job's step sequence.
pub fn first_job_steps_mut(doc: &mut Value) -> Option<&mut Vec<Value>> {
    let jobs = doc.as_mapping_mut()?.get_mut("jobs")?.as_mapping_mut()?;
    let (_, job) = jobs.iter_mut().next()?;
    job.get_mut("steps")?.as_sequence_mut()
}

/// Identities of the first job's steps: `uses` without its ref, or the
/// trimmed `run` command.
pub fn step_identities(doc: &Value) -> HashSet<String> {
    first_job_steps(doc)
        .into_iter()
        .flatten()
        .filter_map(|step| {
            if let Some(uses) = step.get("uses").and_then(Value::as_str) {
                Some(action_identity(uses).to_string())
            } else {
                step.get("run")
                    .and_then(Value::as_str)
                    .map(|r| r.trim().to_string())
            }
        })
        .collect()
}

/// Index of the first step whose name contains `Verify`, else the step count.
pub fn insertion_index(steps: &[Value]) -> usize {
    steps
        .iter()
        .position(|s| {
            s.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.contains("Verify"))
        })
        .unwrap_or(steps.len())
}

// ---------------------------------------------------------------------------
// Line index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Comment,
    Content,
}

#[derive(Debug, Clone)]
struct Line<'a> {
    start: usize,
    end: usize,
    indent: usize,
    kind: LineKind,
    /// Text after the indentation, without the line terminator.
    body: &'a str,
}

fn index_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in text.split_inclusive('\n') {
        let end = start + raw.len();
        let content = raw.trim_end_matches(['\n', '\r']);
        let body = content.trim_start_matches(' ');
        let indent = content.len() - body.len();
        let kind = if body.trim().is_empty() {
            LineKind::Blank
        } else if body.starts_with('#') {
            LineKind::Comment
        } else {
            LineKind::Content
        };
        lines.push(Line {
            start,
            end,
            indent,
            kind,
            body,
        });
        start = end;
    }
    lines
}

static KEY_RE: OnceLock<Regex> = OnceLock::new();

fn key_re() -> &'static Regex {
    KEY_RE.get_or_init(|| {
        Regex::new(r##"^(?:"([^"]*)"|'([^']*)'|([^\s'"#:\-][^:#]*?))\s*:(?:\s+(.*))?$"##).unwrap()
    })
}

/// `(key, rest)` when `body` is a mapping key line.
fn split_key(body: &str) -> Option<(&str, &str)> {
    let caps = key_re().captures(body)?;
    let key = caps.get(1).or(caps.get(2)).or(caps.get(3))?.as_str();
    let rest = caps.get(4).map(|m| m.as_str().trim()).unwrap_or("");
    Some((key, rest))
}

/// A key whose value is a block node on the following lines.
fn is_block_key(line: &Line<'_>, name: Option<&str>) -> bool {
    if line.kind != LineKind::Content {
        return false;
    }
    match split_key(line.body) {
        Some((key, rest)) => {
            name.map_or(true, |n| n == key) && (rest.is_empty() || rest.starts_with('#'))
        }
        None => false,
    }
}

fn is_item(line: &Line<'_>) -> bool {
    line.kind == LineKind::Content && (line.body == "-" || line.body.starts_with("- "))
}

// ---------------------------------------------------------------------------
// WorkflowDocument
// ---------------------------------------------------------------------------

/// Byte layout of the first job's block `steps` sequence.
#[derive(Debug, Clone)]
struct StepsLayout {
    /// Offset where each item begins, including comments directly above it.
    item_starts: Vec<usize>,
    /// Offset just past the last line that belongs to the sequence.
    end: usize,
    indent: usize,
}

/// An existing workflow that can be interpreted as jobs with steps.
#[derive(Debug, Clone)]
pub struct WorkflowDocument<'a> {
    text: &'a str,
    value: Value,
    layout: StepsLayout,
}

impl<'a> WorkflowDocument<'a> {
    /// Interpret `text`. Returns `None` when it is not a workflow whose first
    /// job has a block-style `steps` sequence.
    pub fn parse(text: &'a str) -> Option<Self> {
        let value: Value = serde_yaml::from_str(text).ok()?;
        let step_count = first_job_steps(&value)?.len();
        let layout = locate_steps(text)?;
        if layout.item_starts.len() != step_count {
            return None;
        }
        Some(Self {
            text,
            value,
            layout,
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn name(&self) -> Option<&str> {
        self.value.get("name").and_then(Value::as_str)
    }

    pub fn steps(&self) -> &[Value] {
        first_job_steps(&self.value).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn step_identities(&self) -> HashSet<String> {
        step_identities(&self.value)
    }

    pub fn insertion_index(&self) -> usize {
        insertion_index(self.steps())
    }

    /// Indentation of the `-` of each step item.
    pub fn step_indent(&self) -> usize {
        self.layout.indent
    }

    /// Splice `steps` (each rendered without base indentation) in before the
    /// step at `index`, or after the last step when `index` is past the end.
    pub fn insert_steps(&self, index: usize, steps: &[Vec<String>]) -> String {
        let newline = if self.text.contains("\r\n") { "\r\n" } else { "\n" };
        let indent = " ".repeat(self.layout.indent);

        let mut block = String::new();
        for line in steps.iter().flatten() {
            if !line.is_empty() {
                block.push_str(&indent);
                block.push_str(line);
            }
            block.push_str(newline);
        }

        let offset = self
            .layout
            .item_starts
            .get(index)
            .copied()
            .unwrap_or(self.layout.end);

        let mut out = String::with_capacity(self.text.len() + block.len() + 2);
        out.push_str(&self.text[..offset]);
        if offset > 0 && !self.text[..offset].ends_with('\n') {
            out.push_str(newline);
        }
        out.push_str(&block);
        out.push_str(&self.text[offset..]);
        out
    }
}

fn locate_steps(text: &str) -> Option<StepsLayout> {
    let lines = index_lines(text);
    let content_after = |from: usize| {
        (from..lines.len()).find(|&i| lines[i].kind == LineKind::Content)
    };

    // top-level `jobs:`
    let jobs = lines
        .iter()
        .position(|l| l.indent == 0 && is_block_key(l, Some("jobs")))?;

    // first job key
    let job = content_after(jobs + 1)?;
    let job_indent = lines[job].indent;
    if job_indent == 0 || !is_block_key(&lines[job], None) {
        return None;
    }

    // job body
    let first_body = content_after(job + 1)?;
    let body_indent = lines[first_body].indent;
    if body_indent <= job_indent {
        return None;
    }
    let mut steps_line = None;
    for (i, line) in lines.iter().enumerate().skip(first_body) {
        if line.kind != LineKind::Content {
            continue;
        }
        if line.indent < body_indent {
            break;
        }
        if line.indent == body_indent && is_block_key(line, Some("steps")) {
            steps_line = Some(i);
            break;
        }
    }
    let steps_line = steps_line?;

    // sequence items
    let first_item = content_after(steps_line + 1)?;
    let item_indent = lines[first_item].indent;
    if item_indent < body_indent || !is_item(&lines[first_item]) {
        return None;
    }

    let mut item_lines = Vec::new();
    let mut last = steps_line;
    for (i, line) in lines.iter().enumerate().skip(first_item) {
        match line.kind {
            LineKind::Blank => continue,
            LineKind::Comment => {
                if line.indent >= item_indent {
                    last = i;
                }
            }
            LineKind::Content => {
                if line.indent < item_indent || (line.indent == item_indent && !is_item(line)) {
                    break;
                }
                if line.indent == item_indent {
                    item_lines.push(i);
                }
                last = i;
            }
        }
    }

    let item_starts = item_lines
        .iter()
        .map(|&i| {
            let mut start = i;
            while start > steps_line + 1
                && lines[start - 1].kind == LineKind::Comment
                && lines[start - 1].indent >= item_indent
            {
                start -= 1;
            }
            lines[start].start
        })
        .collect();

    Some(StepsLayout {
        item_starts,
        end: lines[last].end,
        indent: item_indent,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WORKFLOW: &str = "\
# Custom copilot setup
name: My Setup

on: workflow_dispatch

jobs:
  copilot-setup-steps:
    runs-on: [self-hosted, linux]
    timeout-minutes: 12
    steps:
      - name: Checkout
        uses: actions/checkout@v4  # keep
      # verification comes last
      - name: Verify tools
        run: |
          node --version

  other:
    runs-on: ubuntu-latest
    steps:
      - run: echo other
";

    fn step(name: &str, uses: &str) -> Vec<String> {
        vec![format!("- name: {name}"), format!("  uses: {uses}")]
    }

    #[test]
    fn parses_layout() {
        let doc = WorkflowDocument::parse(WORKFLOW).unwrap();
        assert_eq!(doc.name(), Some("My Setup"));
        assert_eq!(doc.steps().len(), 2);
        assert_eq!(doc.step_indent(), 6);
        assert_eq!(doc.insertion_index(), 1);
        let ids = doc.step_identities();
        assert!(ids.contains("actions/checkout"));
        assert!(ids.contains("node --version"));
    }

    #[test]
    fn inserts_before_verify_and_above_its_comment() {
        let doc = WorkflowDocument::parse(WORKFLOW).unwrap();
        let out = doc.insert_steps(1, &[step("Setup Node.js", "actions/setup-node@v4")]);
        let expected = WORKFLOW.replace(
            "      # verification comes last\n",
            "      - name: Setup Node.js\n        uses: actions/setup-node@v4\n      # verification comes last\n",
        );
        assert_eq!(out, expected);

        let reparsed = WorkflowDocument::parse(&out).unwrap();
        assert_eq!(reparsed.steps().len(), 3);
        assert_eq!(reparsed.steps()[1]["uses"], "actions/setup-node@v4");
    }

    #[test]
    fn appends_after_last_step_when_no_verify() {
        let text = "jobs:\n  build:\n    steps:\n    - uses: actions/checkout@v4\n    - run: make\n";
        let doc = WorkflowDocument::parse(text).unwrap();
        assert_eq!(doc.insertion_index(), 2);
        assert_eq!(doc.step_indent(), 4);
        let out = doc.insert_steps(2, &[step("Setup Go", "actions/setup-go@v5")]);
        assert_eq!(
            out,
            "jobs:\n  build:\n    steps:\n    - uses: actions/checkout@v4\n    - run: make\n    - name: Setup Go\n      uses: actions/setup-go@v5\n"
        );
    }

    #[test]
    fn indentless_sequence_followed_by_sibling_key() {
        let text = "jobs:\n  build:\n    steps:\n    - run: make\n    env:\n      A: b\n";
        let doc = WorkflowDocument::parse(text).unwrap();
        let out = doc.insert_steps(1, &[step("Setup Go", "actions/setup-go@v5")]);
        let value: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(first_job_steps(&value).unwrap().len(), 2);
        assert_eq!(value["jobs"]["build"]["env"]["A"], "b");
    }

    #[test]
    fn missing_trailing_newline_is_handled() {
        let text = "jobs:\n  a:\n    steps:\n      - run: make";
        let doc = WorkflowDocument::parse(text).unwrap();
        let out = doc.insert_steps(1, &[step("Setup Go", "actions/setup-go@v5")]);
        assert!(out.starts_with(text));
        let value: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(first_job_steps(&value).unwrap().len(), 2);
    }

    #[test]
    fn crlf_line_endings_are_kept() {
        let text = "jobs:\r\n  a:\r\n    steps:\r\n      - run: make\r\n";
        let doc = WorkflowDocument::parse(text).unwrap();
        let out = doc.insert_steps(1, &[step("Setup Go", "actions/setup-go@v5")]);
        assert!(out.ends_with("      - name: Setup Go\r\n        uses: actions/setup-go@v5\r\n"));
        assert!(!out.replace("\r\n", "").contains('\r'));
    }

    #[test]
    fn non_workflows_are_rejected() {
        for text in [
            "- just\n- a list\n",
            "name: no jobs\n",
            "jobs:\n  a:\n    runs-on: x\n",
            "jobs:\n  a:\n    steps: []\n",
            "jobs: [unclosed",
        ] {
            assert!(WorkflowDocument::parse(text).is_none(), "accepted: {text:?}");
        }
    }

    #[test]
    fn block_scalar_dashes_are_not_items() {
        let text = "jobs:\n  a:\n    steps:\n      - run: |\n          - not an item\n      - run: make\n";
        let doc = WorkflowDocument::parse(text).unwrap();
        assert_eq!(doc.steps().len(), 2);
    }

    #[test]
    fn quoted_keys_are_recognised() {
        assert_eq!(split_key("\"jobs\":"), Some(("jobs", "")));
        assert_eq!(split_key("steps:   # list"), Some(("steps", "# list")));
        assert_eq!(split_key("runs-on: ubuntu-latest"), Some(("runs-on", "ubuntu-latest")));
        assert_eq!(split_key("- run: make"), None);
    }

    #[test]
    fn identities_of_non_workflow_are_empty() {
        let value: Value = serde_yaml::from_str("a: 1").unwrap();
        assert!(step_identities(&value).is_empty());
    }
}
