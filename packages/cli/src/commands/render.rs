use super::{read_document, write_output};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use compose_editor::{EditSession, LocalSink, Record};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Stored document (JSON)
    pub input: PathBuf,

    /// Render the editing surface instead of the export payload
    #[arg(long, conflicts_with = "records")]
    pub view: bool,

    /// JSON array of records to populate the document for
    #[arg(short, long)]
    pub records: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let document = read_document(&args.input)?;
    let mut session = EditSession::with_options("render", document, config.session_options())
        .with_condition_groups(config.condition_groups.clone())
        .with_merge_fields(config.merge_fields.clone());

    let output = if args.view {
        session.render()
    } else if let Some(path) = &args.records {
        let records = read_records(path)?;
        let mut sink = LocalSink::new(config.condition_groups.clone());
        let populated = session.preview(&mut sink, &records)?;
        config.to_json(&populated)?
    } else {
        config.to_json(&session.egest())?
    };

    write_output(args.out.as_deref(), &output)?;
    if let Some(out) = &args.out {
        eprintln!("{} {} → {}", "✓".green(), args.input.display(), out.display());
    }
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} must be a JSON array of objects", path.display()))
}
