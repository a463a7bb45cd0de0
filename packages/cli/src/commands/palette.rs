use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use compose_editor::generate_colours;

#[derive(Debug, Args)]
pub struct PaletteArgs {
    /// Number of colours (defaults to the configured condition groups)
    #[arg(short, long)]
    pub size: Option<usize>,
}

pub fn palette(args: PaletteArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let size = args.size.unwrap_or(config.condition_groups.len());

    for (index, colour) in generate_colours(size).iter().enumerate() {
        let name = config
            .condition_groups
            .get(index)
            .map(|g| g.name.as_str())
            .unwrap_or("");
        println!("{:>3}  {}  {}", index, colour.bold(), name);
    }
    if size == 0 {
        println!("{}", "No condition groups configured".yellow());
    }
    Ok(())
}
