//! Branch ruleset that requests Copilot code review on pull requests.

use crate::config::RulesetConfig;
use crate::error::{KitError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tracing::debug;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub owner: String,
    pub repo: String,
}

/// A ruleset as listed by the API; only the fields used here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetSummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub enforcement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefNameCondition {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetConditions {
    pub ref_name: RefNameCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Request body for `POST /repos/{owner}/{repo}/rulesets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetPayload {
    pub name: String,
    pub target: String,
    pub enforcement: String,
    pub conditions: RulesetConditions,
    pub rules: Vec<Rule>,
}

/// Operations consumed from the hosting service.
pub trait RulesetGateway {
    fn is_authenticated(&self) -> bool;
    fn get_repo_info(&self, dir: &Path) -> Result<RepoInfo>;
    fn has_advanced_security(&self, owner: &str, repo: &str) -> Result<bool>;
    fn list_rulesets(&self, owner: &str, repo: &str) -> Result<Vec<RulesetSummary>>;
    fn create_ruleset(&self, owner: &str, repo: &str, payload: &RulesetPayload) -> Result<RulesetSummary>;
}

// ---------------------------------------------------------------------------
// Remote URL parsing
// ---------------------------------------------------------------------------

/// Owner and repository from a GitHub remote URL, in SSH or HTTPS form.
pub fn parse_remote_url(url: &str) -> Option<RepoInfo> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("git@github.com:") {
        rest
    } else if let Some(rest) = url.strip_prefix("ssh://git@github.com/") {
        rest
    } else {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))?;
        let rest = rest.split_once('@').map_or(rest, |(_, host)| host);
        rest.strip_prefix("github.com/")?
    };
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some(RepoInfo {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Read the `origin` remote of the git repository at `dir`.
pub fn repo_info_from_git(dir: &Path) -> Result<RepoInfo> {
    let display = dir.display().to_string();
    let output = std::process::Command::new("git")
        .args(["remote", "get-url", "origin"])
        .current_dir(dir)
        .output()
        .map_err(|_| KitError::NoGitHubRemote(display.clone()))?;
    if !output.status.success() {
        return Err(KitError::NoGitHubRemote(display));
    }
    let url = String::from_utf8_lossy(&output.stdout);
    parse_remote_url(&url).ok_or(KitError::NoGitHubRemote(display))
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

pub fn build_payload(config: &RulesetConfig, advanced_security: bool) -> RulesetPayload {
    let mut rules = vec![Rule {
        kind: "copilot_code_review".to_string(),
        parameters: Some(json!({
            "review_on_push": true,
            "review_draft_pull_requests": false,
        })),
    }];
    if advanced_security {
        rules.push(Rule {
            kind: "code_scanning".to_string(),
            parameters: Some(json!({
                "code_scanning_tools": [{
                    "tool": "CodeQL",
                    "security_alerts_threshold": "high_or_higher",
                    "alerts_threshold": "errors",
                }],
            })),
        });
    }
    RulesetPayload {
        name: config.name.clone(),
        target: "branch".to_string(),
        enforcement: "active".to_string(),
        conditions: RulesetConditions {
            ref_name: RefNameCondition {
                include: config.branches.clone(),
                exclude: Vec::new(),
            },
        },
        rules,
    }
}

// ---------------------------------------------------------------------------
// Ensure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesetOutcome {
    Created,
    Exists,
    /// Dry run: the ruleset would have been created.
    WouldCreate,
}

impl RulesetOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RulesetOutcome::Created => "created",
            RulesetOutcome::Exists => "exists",
            RulesetOutcome::WouldCreate => "would_create",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RulesetReport {
    pub outcome: RulesetOutcome,
    pub repo: RepoInfo,
    pub payload: RulesetPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

/// Create the configured ruleset unless one with the same name exists.
pub fn ensure_ruleset(
    gateway: &dyn RulesetGateway,
    dir: &Path,
    config: &RulesetConfig,
    dry_run: bool,
) -> Result<RulesetReport> {
    if !gateway.is_authenticated() {
        return Err(KitError::NotAuthenticated);
    }
    let repo = gateway.get_repo_info(dir)?;
    let advanced_security = gateway.has_advanced_security(&repo.owner, &repo.repo)?;
    let payload = build_payload(config, advanced_security);
    debug!(owner = %repo.owner, repo = %repo.repo, advanced_security, "checking rulesets");

    let existing = gateway.list_rulesets(&repo.owner, &repo.repo)?;
    if let Some(found) = existing.iter().find(|r| r.name == config.name) {
        return Ok(RulesetReport {
            outcome: RulesetOutcome::Exists,
            repo,
            payload,
            id: Some(found.id),
        });
    }

    if dry_run {
        return Ok(RulesetReport {
            outcome: RulesetOutcome::WouldCreate,
            repo,
            payload,
            id: None,
        });
    }

    let created = gateway.create_ruleset(&repo.owner, &repo.repo, &payload)?;
    Ok(RulesetReport {
        outcome: RulesetOutcome::Created,
        repo,
        payload,
        id: Some(created.id),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
