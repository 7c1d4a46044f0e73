use crate::output::print_json;
use anyhow::Context;
use copilot_kit_core::config::Config;
use copilot_kit_core::github::GitHubClient;
use copilot_kit_core::ruleset::{self, RulesetOutcome};
use std::path::Path;

pub fn run(root: &Path, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let client = GitHubClient::from_env().context("failed to create GitHub client")?;
    let report = ruleset::ensure_ruleset(&client, root, &config.ruleset, dry_run)
        .context("failed to ensure ruleset")?;

    if json {
        return print_json(&report);
    }

    let repo = format!("{}/{}", report.repo.owner, report.repo.repo);
    match report.outcome {
        RulesetOutcome::Exists => {
            println!("Ruleset '{}' already exists on {repo}.", report.payload.name)
        }
        RulesetOutcome::Created => println!("Created ruleset '{}' on {repo}.", report.payload.name),
        RulesetOutcome::WouldCreate => {
            println!("Would create ruleset '{}' on {repo}:", report.payload.name);
            println!("{}", serde_json::to_string_pretty(&report.payload)?);
        }
    }
    Ok(())
}
