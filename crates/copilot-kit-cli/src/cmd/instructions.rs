use crate::output::{print_diagnostics, print_json, print_table, summary};
use copilot_kit_core::instructions;
use std::path::Path;

pub fn run(root: &Path, strict: bool, json: bool) -> anyhow::Result<()> {
    let report = instructions::coverage(root);

    if json {
        print_json(&report)?;
    } else {
        let repo = if report.repo_instructions { "present" } else { "missing" };
        println!("Repository instructions: {repo}");
        println!("Instruction files: {}", report.instruction_files.len());
        if !report.languages.is_empty() {
            println!();
            let rows = report
                .languages
                .iter()
                .map(|l| {
                    vec![
                        l.language.clone(),
                        l.files.to_string(),
                        if l.is_covered() {
                            l.covered_by.join(", ")
                        } else {
                            "-".to_string()
                        },
                    ]
                })
                .collect();
            print_table(&["LANGUAGE", "FILES", "COVERED BY"], rows);
        }
        if !report.diagnostics.is_empty() {
            println!();
            print_diagnostics(&report.diagnostics);
            println!();
            println!("{}", summary(&report.diagnostics));
        }
    }

    if report.fails(strict) {
        anyhow::bail!("instruction coverage check failed");
    }
    Ok(())
}
