mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, setup_steps::SetupStepsArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "copilot-kit",
    about = "Scaffold and check GitHub Copilot configuration for a repository",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .github/ or .git/)
    #[arg(long, global = true, env = "COPILOT_KIT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log detection and merge decisions
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update .github/workflows/copilot-setup-steps.yml
    SetupSteps(SetupStepsArgs),

    /// Check agent and skill frontmatter
    Lint,

    /// Report which languages are covered by custom instructions
    Instructions {
        /// Fail on warnings as well as errors
        #[arg(long)]
        strict: bool,
    },

    /// Ensure the Copilot code review ruleset exists on GitHub
    Ruleset {
        /// Show the ruleset that would be created without creating it
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect the copilot-kit configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::SetupSteps(args) => cmd::setup_steps::run(&root, args, cli.json),
        Commands::Lint => cmd::lint::run(&root, cli.json),
        Commands::Instructions { strict } => cmd::instructions::run(&root, strict, cli.json),
        Commands::Ruleset { dry_run } => cmd::ruleset::run(&root, dry_run, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
