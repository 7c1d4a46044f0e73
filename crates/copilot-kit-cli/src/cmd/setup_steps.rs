use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Args;
use copilot_kit_core::config::{Config, PinMode};
use copilot_kit_core::github::GitHubClient;
use copilot_kit_core::paths;
use copilot_kit_core::setup_steps::{self, SetupOptions, SetupOutcome};
use copilot_kit_core::update::UpdateMethod;
use std::path::Path;

#[derive(Args)]
pub struct SetupStepsArgs {
    /// Print the workflow instead of writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Write `@RESOLVE_VERSION` in place of every action ref
    #[arg(long, conflicts_with_all = ["pin", "resolve"])]
    pub placeholder: bool,

    /// Pin actions to the recorded commit SHAs
    #[arg(long, conflicts_with = "resolve")]
    pub pin: bool,

    /// Pin actions, resolving unrecorded SHAs through the GitHub API
    #[arg(long)]
    pub resolve: bool,
}

impl SetupStepsArgs {
    fn pin_mode(&self, configured: PinMode) -> PinMode {
        if self.placeholder {
            PinMode::Placeholder
        } else if self.pin || self.resolve {
            PinMode::Pinned
        } else {
            configured
        }
    }
}

pub fn run(root: &Path, args: SetupStepsArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;

    let resolved = if args.resolve {
        let client = GitHubClient::from_env().context("failed to create GitHub client")?;
        client
            .resolve_unpinned()
            .context("failed to resolve action versions")?
    } else {
        Vec::new()
    };
    let mode = args.pin_mode(config.setup.version_mode);
    let options = SetupOptions {
        setup: config.setup.clone(),
        version_mode: setup_steps::version_mode_for(mode, resolved),
    };

    let plan = setup_steps::plan(root, &options).context("failed to plan setup workflow")?;
    let written = setup_steps::apply(&plan, args.dry_run)
        .with_context(|| format!("failed to write {}", plan.path.display()))?;

    if json {
        let value = serde_json::json!({
            "outcome": plan.outcome,
            "path": paths::relative_display(root, &plan.path),
            "written": written,
            "dry_run": args.dry_run,
            "method": plan.method,
            "added": plan.added,
            "candidates": plan.candidates,
            "content": plan.content,
        });
        return print_json(&value);
    }

    let display = paths::relative_display(root, &plan.path);
    if args.dry_run {
        if let Some(content) = &plan.content {
            print!("{content}");
            return Ok(());
        }
    }

    match plan.outcome {
        SetupOutcome::Unchanged => {
            println!("{display} is up to date.");
            return Ok(());
        }
        SetupOutcome::Created => println!("Created {display}"),
        SetupOutcome::Updated if plan.method == Some(UpdateMethod::Regenerated) => {
            println!("Regenerated {display} (existing file was not a workflow)")
        }
        SetupOutcome::Updated => println!("Updated {display}"),
    }

    let rows = plan
        .added
        .iter()
        .map(|c| {
            vec![
                c.display_name(),
                if c.is_action() {
                    c.action.clone()
                } else {
                    c.run.clone().unwrap_or_default()
                },
                c.source.as_str().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    if !rows.is_empty() {
        println!();
        print_table(&["STEP", "ACTION / RUN", "SOURCE"], rows);
    }
    Ok(())
}
