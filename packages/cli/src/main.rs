mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{import, palette, render, validate, ImportArgs, PaletteArgs, RenderArgs, ValidateArgs};

/// Compose CLI - render, import and check email content documents
#[derive(Parser, Debug)]
#[command(name = "compose")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a stored document to HTML
    Render(RenderArgs),

    /// Convert HTML into a stored document
    Import(ImportArgs),

    /// Check condition and merge-field references
    Validate(ValidateArgs),

    /// Print the condition group colours
    Palette(PaletteArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Render(args) => render(args, &cwd),
                Command::Import(args) => import(args, &cwd),
                Command::Validate(args) => validate(args, &cwd),
                Command::Palette(args) => palette(args, &cwd),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
