use super::{print_json, read_json};
use aerial_dom::{diff_node, SyntheticNode};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Snapshot the mutations apply to
    pub old: PathBuf,

    /// Snapshot the mutations lead to
    pub new: PathBuf,

    /// Pretty-print the mutation list
    #[arg(short, long)]
    pub pretty: bool,
}

/// Print the mutations that turn OLD into NEW
pub fn diff(args: DiffArgs) -> Result<()> {
    let old: SyntheticNode = read_json(&args.old)?;
    let new: SyntheticNode = read_json(&args.new)?;

    let mutations = diff_node(&old, &new);
    eprintln!("{} {} mutations", "Diffed".green().bold(), mutations.len());
    print_json(&mutations, args.pretty)
}
