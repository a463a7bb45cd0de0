use super::write_output;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use compose_editor::Ingest;
use compose_markup::{deserialize, deserialize_paste};
use compose_model::Document;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// HTML file to convert
    pub input: PathBuf,

    /// Treat the input as pasted content and sanitize it first
    #[arg(long)]
    pub paste: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn import(args: ImportArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let html = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;

    let document = if args.paste {
        Document::new(deserialize_paste(&html))
    } else {
        deserialize(&html)
    };
    tracing::debug!(blocks = document.nodes.len(), paste = args.paste, "imported document");

    let payload = Ingest {
        block_map: Some(document),
    };
    write_output(args.out.as_deref(), &config.to_json(&payload)?)?;
    if let Some(out) = &args.out {
        eprintln!("{} {} → {}", "✓".green(), args.input.display(), out.display());
    }
    Ok(())
}
