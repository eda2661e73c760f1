//! Remove mend's cache, run record and logs.
//!
//! Core logic decides what to remove from existence checks alone.
//! IO happens only at the top level.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILE};
use crate::state::{LOG_FILE, RUN_RECORD_FILE, STATE_DIR};

/// Generated paths, removed by a plain `mend clean`.
fn state_paths(cache_dir: &Path) -> Vec<PathBuf> {
    vec![
        cache_dir.to_path_buf(),
        PathBuf::from(RUN_RECORD_FILE),
        Path::new(STATE_DIR).join(LOG_FILE),
    ]
}

/// Additionally removed with `--all`.
fn config_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(CONFIG_FILE), PathBuf::from(STATE_DIR)]
}

fn paths_to_clean<E>(all: bool, cache_dir: &Path, exists: E) -> Vec<PathBuf>
where
    E: Fn(&Path) -> bool,
{
    let mut paths = state_paths(cache_dir);
    if all {
        paths.extend(config_paths());
    }
    paths.into_iter().filter(|p| exists(p)).collect()
}

/// Removes existing paths and returns them.
fn clean_paths<E, R>(all: bool, cache_dir: &Path, exists: E, mut remove: R) -> Result<Vec<PathBuf>>
where
    E: Fn(&Path) -> bool,
    R: FnMut(&Path) -> Result<()>,
{
    let mut removed = Vec::new();
    for path in paths_to_clean(all, cache_dir, &exists) {
        // An earlier removal (the state dir) may have taken it already.
        if !exists(&path) {
            continue;
        }
        remove(&path)?;
        removed.push(path);
    }
    Ok(removed)
}

fn format_results(removed: &[PathBuf]) -> String {
    let mut out = String::new();
    if removed.is_empty() {
        let _ = writeln!(&mut out, "\n{} Nothing to clean.", "ℹ".blue());
    } else {
        let _ = writeln!(&mut out, "\n{} Removed:", "✓".green());
        for path in removed {
            let _ = writeln!(
                &mut out,
                "  {} {}",
                "✗".red(),
                path.display().to_string().dimmed()
            );
        }
    }
    out
}

fn remove_path(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.with_context(|| format!("Failed to remove {}", path.display()))
}

/// Runs clean against the current directory.
pub(crate) fn run(all: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = Config::load(&cwd).unwrap_or_default();

    let removed = clean_paths(
        all,
        &config.cache.dir,
        |path| cwd.join(path).exists(),
        |path| remove_path(&cwd.join(path)),
    )?;

    print!("{}", format_results(&removed));
    Ok(())
}
