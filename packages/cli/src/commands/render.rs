use super::read_json;
use aerial_dom::{annotate_sources, to_html, SyntheticNode};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Snapshot to render
    pub tree: PathBuf,

    /// Print the snapshot stamped with source ranges under this uri
    /// instead of the HTML
    #[arg(long)]
    pub annotate: Option<String>,
}

pub fn render(args: RenderArgs) -> Result<()> {
    let mut tree: SyntheticNode = read_json(&args.tree)?;

    match args.annotate {
        Some(uri) => {
            annotate_sources(&mut tree, &uri);
            super::print_json(&tree, true)
        }
        None => {
            println!("{}", to_html(&tree));
            Ok(())
        }
    }
}
