//! Shared knowledge about well-known setup actions: version pins, display
//! names and the command that prints the installed tool version.

use serde::{Deserialize, Serialize};

pub const CHECKOUT_ACTION: &str = "actions/checkout";
pub const MISE_ACTION: &str = "jdx/mise-action";
pub const SETUP_NODE_ACTION: &str = "actions/setup-node";
pub const SETUP_PYTHON_ACTION: &str = "actions/setup-python";
pub const SETUP_JAVA_ACTION: &str = "actions/setup-java";
pub const SETUP_GO_ACTION: &str = "actions/setup-go";
pub const SETUP_RUBY_ACTION: &str = "ruby/setup-ruby";

/// Sentinel rendered in place of a ref when pins are resolved later.
pub const RESOLVE_PLACEHOLDER: &str = "RESOLVE_VERSION";

/// A pin for an action: immutable commit plus the tag it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVersion {
    pub action: String,
    pub sha: String,
    pub version_tag: String,
}

struct KnownAction {
    action: &'static str,
    display: &'static str,
    tag: &'static str,
    sha: Option<&'static str>,
    version_command: Option<&'static str>,
}

const KNOWN_ACTIONS: &[KnownAction] = &[
    KnownAction {
        action: CHECKOUT_ACTION,
        display: "Checkout code",
        tag: "v4.2.2",
        sha: Some("11bd71901bbe5b1630ceea73d27597364c9af683"),
        version_command: None,
    },
    KnownAction {
        action: SETUP_NODE_ACTION,
        display: "Setup Node.js",
        tag: "v4.4.0",
        sha: Some("49933ea5288caeca8642d1e84afbd3f7d6820020"),
        version_command: Some("node --version"),
    },
    KnownAction {
        action: SETUP_PYTHON_ACTION,
        display: "Setup Python",
        tag: "v5.6.0",
        sha: Some("a26af69be951a213d495a4c3e4e4022e16d87065"),
        version_command: Some("python --version"),
    },
    KnownAction {
        action: SETUP_JAVA_ACTION,
        display: "Setup Java",
        tag: "v4.7.1",
        sha: Some("c5195efecf7bdfc987ee8bae7a71cb8b11521c00"),
        version_command: Some("java -version"),
    },
    KnownAction {
        action: SETUP_GO_ACTION,
        display: "Setup Go",
        tag: "v5.5.0",
        sha: Some("d35c59abb061a4a6fb18e82ac0862c26744d6ab5"),
        version_command: Some("go version"),
    },
    KnownAction {
        action: SETUP_RUBY_ACTION,
        display: "Setup Ruby",
        tag: "v1",
        sha: None,
        version_command: Some("ruby --version"),
    },
    KnownAction {
        action: MISE_ACTION,
        display: "Setup mise",
        tag: "v2",
        sha: None,
        version_command: Some("mise --version"),
    },
];

fn known(action: &str) -> Option<&'static KnownAction> {
    let id = action_identity(action);
    KNOWN_ACTIONS.iter().find(|k| k.action == id)
}

/// Strip any `@ref` suffix: `actions/setup-node@v4` → `actions/setup-node`.
pub fn action_identity(uses: &str) -> &str {
    let trimmed = uses.trim();
    match trimmed.split_once('@') {
        Some((id, _)) => id,
        None => trimmed,
    }
}

/// Floating major tag for a known action (`v4.2.2` → `v4`).
pub fn floating_tag(action: &str) -> Option<String> {
    let k = known(action)?;
    Some(k.tag.split('.').next().unwrap_or(k.tag).to_string())
}

/// The static pin for a known action, if a commit is recorded for it.
pub fn static_pin(action: &str) -> Option<ResolvedVersion> {
    let k = known(action)?;
    k.sha.map(|sha| ResolvedVersion {
        action: k.action.to_string(),
        sha: sha.to_string(),
        version_tag: k.tag.to_string(),
    })
}

/// Every recorded static pin.
pub fn static_pins() -> Vec<ResolvedVersion> {
    KNOWN_ACTIONS
        .iter()
        .filter_map(|k| static_pin(k.action))
        .collect()
}

/// All actions in the table without a recorded commit, with their tag.
pub fn unpinned_actions() -> Vec<(&'static str, &'static str)> {
    KNOWN_ACTIONS
        .iter()
        .filter(|k| k.sha.is_none())
        .map(|k| (k.action, k.tag))
        .collect()
}

/// Human-readable step name for an action.
pub fn action_display_name(action: &str) -> String {
    if let Some(k) = known(action) {
        return k.display.to_string();
    }
    let id = action_identity(action);
    let repo = id.split('/').nth(1).unwrap_or(id);
    let tool = repo.strip_prefix("setup-").unwrap_or(repo);
    format!("Setup {tool}")
}

/// Command that prints the tool version installed by `action`.
pub fn version_command(action: &str) -> Option<&'static str> {
    known(action).and_then(|k| k.version_command)
}
