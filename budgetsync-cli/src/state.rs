use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$HOME/.budgetsync`, where config and credentials live
pub fn budgetsync_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".budgetsync"))
}

pub fn ensure_budgetsync_home() -> Result<PathBuf> {
    let dir = budgetsync_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
