use crate::output::{print_diagnostics, print_json, summary};
use anyhow::Context;
use copilot_kit_core::config::Config;
use copilot_kit_core::lint;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let report = lint::lint(root, &config.lint);

    if json {
        print_json(&report)?;
    } else if report.diagnostics.is_empty() {
        println!("Checked {} file(s). No problems found.", report.files_checked);
    } else {
        print_diagnostics(&report.diagnostics);
        println!();
        println!(
            "Checked {} file(s): {}",
            report.files_checked,
            summary(&report.diagnostics)
        );
    }

    if report.has_errors() {
        anyhow::bail!("lint found {} error(s)", report.error_count());
    }
    Ok(())
}
