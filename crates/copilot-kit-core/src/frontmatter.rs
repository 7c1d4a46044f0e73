//! YAML frontmatter of Markdown files (agents, skills, instructions).

use serde_yaml::Value;

/// A Markdown file split into its frontmatter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    pub yaml: &'a str,
    pub body: &'a str,
}

/// Split `content` at the first pair of `---` delimiter lines.
pub fn split(content: &str) -> Option<Split<'_>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content.strip_prefix("---")?;
    let rest = if let Some(r) = rest.strip_prefix('\n') {
        r
    } else if let Some(r) = rest.strip_prefix("\r\n") {
        r
    } else {
        return None;
    };

    let end = if is_delimiter_at(rest, 0) {
        0
    } else {
        let mut found = None;
        let mut search = 0;
        while let Some(pos) = rest[search..].find("\n---") {
            let at = search + pos + 1;
            if is_delimiter_at(rest, at) {
                found = Some(at);
                break;
            }
            search = at;
        }
        found?
    };

    let yaml = rest[..end].trim_end_matches(['\n', '\r']);
    let after = &rest[end + 3..];
    let body = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .unwrap_or(after);
    Some(Split { yaml, body })
}

/// `---` at `at` followed by end of line or end of input.
fn is_delimiter_at(text: &str, at: usize) -> bool {
    let Some(tail) = text[at..].strip_prefix("---") else {
        return false;
    };
    tail.is_empty() || tail.starts_with('\n') || tail.starts_with("\r\n")
}

/// Look up a string-valued key in a parsed frontmatter mapping.
pub fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}
