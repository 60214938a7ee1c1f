use super::{path_uri, print_json, read_json};
use aerial_dom::{annotate_sources, SyntheticNode};
use aerial_editor::{project_diff, ProjectionWarning};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Snapshot the source text was rendered from
    pub old: PathBuf,

    /// Snapshot the source text should now describe
    pub new: PathBuf,

    /// Print the text edits as JSON instead of the rewritten HTML
    #[arg(long)]
    pub edits: bool,
}

/// Render OLD, then rewrite that text to match NEW through minimal edits
pub fn project(args: ProjectArgs) -> Result<()> {
    let mut old: SyntheticNode = read_json(&args.old)?;
    let new: SyntheticNode = read_json(&args.new)?;

    let uri = path_uri(&args.old);
    let html = annotate_sources(&mut old, &uri);
    let projection = project_diff(&old, &new).context("failed to project the diff")?;

    for warning in &projection.warnings {
        match warning {
            ProjectionWarning::ProvenanceGap { target } => {
                eprintln!("   {} no source for {}", "warning".yellow(), target)
            }
            ProjectionWarning::Overlap { uri, range } => {
                eprintln!(
                    "   {} dropped overlapping edit {}..{} in {}",
                    "warning".yellow(),
                    range.start,
                    range.end,
                    uri
                )
            }
        }
    }

    if args.edits {
        return print_json(&projection, true);
    }

    let text = projection.apply(&uri, &html)?;
    eprintln!(
        "{} {} edits",
        "Projected".green().bold(),
        projection.edits_for(&uri).len()
    );
    println!("{}", text);
    Ok(())
}
