use super::{path_uri, print_json, read_json};
use crate::config::Config;
use aerial_common::SequentialIds;
use aerial_dom::{apply_mutations, Mutation, PatchPolicy, SyntheticNode};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PatchArgs {
    /// Snapshot to patch
    pub tree: PathBuf,

    /// JSON list of mutations, as printed by `aerial diff`
    pub mutations: PathBuf,

    /// Skip failing mutations instead of stopping at the first one
    #[arg(long)]
    pub skip_failures: bool,

    /// Pretty-print the patched snapshot
    #[arg(short, long)]
    pub pretty: bool,
}

/// Apply MUTATIONS to TREE and print the patched snapshot
pub fn patch(args: PatchArgs, config: &Config) -> Result<()> {
    let mut tree: SyntheticNode = read_json(&args.tree)?;
    let mutations: Vec<Mutation> = read_json(&args.mutations)?;

    let policy = if args.skip_failures {
        PatchPolicy::SkipAndContinue
    } else {
        config.patch_policy
    };
    let mut ids = match &config.id_seed {
        Some(seed) => SequentialIds::from_seed(seed.clone()),
        None => SequentialIds::new(&path_uri(&args.tree)),
    };

    let report = apply_mutations(&mut tree, &mutations, &mut ids, policy)
        .with_context(|| format!("failed to patch {}", args.tree.display()))?;

    eprintln!(
        "{} {} applied, {} unchanged",
        "Patched".green().bold(),
        report.applied,
        report.unchanged
    );
    for skipped in &report.skipped {
        eprintln!("   {} #{}: {}", "skipped".yellow(), skipped.index, skipped.error);
    }

    print_json(&tree, args.pretty)
}
