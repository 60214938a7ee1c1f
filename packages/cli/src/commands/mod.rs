pub mod diff;
pub mod patch;
pub mod project;
pub mod render;

pub use diff::{diff, DiffArgs};
pub use patch::{patch, PatchArgs};
pub use project::{project, ProjectArgs};
pub use render::{render, RenderArgs};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a valid snapshot", path.display()))
}

pub(crate) fn print_json(value: &impl Serialize, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

/// File uri for a path on disk, used as provenance and id seed
pub(crate) fn path_uri(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}
