mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{diff, patch, project, render, DiffArgs, PatchArgs, ProjectArgs, RenderArgs};
use config::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Aerial CLI - diff and patch synthetic DOM snapshots
#[derive(Parser, Debug)]
#[command(name = "aerial")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the mutations that turn one snapshot into another
    Diff(DiffArgs),

    /// Apply a mutation list to a snapshot
    Patch(PatchArgs),

    /// Render a snapshot as HTML
    Render(RenderArgs),

    /// Rewrite the HTML of one snapshot to match another
    Project(ProjectArgs),
}

fn run(cli: Cli, cwd: &str) -> anyhow::Result<()> {
    let config = Config::load(cwd)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();
    debug!(?config, "loaded config");

    match cli.command {
        Command::Diff(args) => diff(args),
        Command::Patch(args) => patch(args, &config),
        Command::Render(args) => render(args),
        Command::Project(args) => project(args),
    }
}

fn main() {
    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| run(cli, &cwd.display().to_string()));

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
