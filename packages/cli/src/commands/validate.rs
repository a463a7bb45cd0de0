use super::read_document;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use compose_editor::{content_issues, validate_condition_groups};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Stored documents (JSON) to check
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

pub fn validate(args: ValidateArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    validate_condition_groups(&config.condition_groups)?;

    let mut failed = 0;
    for input in &args.inputs {
        let document = read_document(input)?;
        let issues = content_issues(&document, &config.condition_groups, &config.merge_fields);

        if issues.is_empty() {
            println!("  {} {}", "✓".green(), input.display());
            continue;
        }
        failed += 1;
        println!("  {} {}", "✗".red(), input.display());
        for issue in issues {
            println!("      {}", issue.to_string().red());
        }
    }

    println!();
    if failed > 0 {
        return Err(anyhow!("{} of {} documents have invalid references", failed, args.inputs.len()));
    }
    println!("{} {} documents valid", "✅".green(), args.inputs.len());
    Ok(())
}
