//! Write mend's configuration into a repository.
//!
//! The core takes closures for filesystem access, so what gets written,
//! skipped or overwritten is testable without touching disk.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::CONFIG_FILE;
use crate::state::STATE_DIR;
use crate::templates;

/// Runs the init command in the current directory.
pub(crate) fn run(force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    info!("Initializing mend in {}", cwd.display());

    let files = init_files();
    let results = init_project(
        &files,
        force,
        |path| cwd.join(path).exists(),
        |path| {
            fs::create_dir_all(cwd.join(path))
                .with_context(|| format!("Failed to create directory: {}", path.display()))
        },
        |path, content| {
            fs::write(cwd.join(path), content)
                .with_context(|| format!("Failed to write {}", path.display()))
        },
    )?;

    print!("{}", format_results(&results, &files));
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InitFile {
    path: PathBuf,
    content: &'static str,
    description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteResult {
    Created,
    Overwritten,
    Skipped,
}

fn init_files() -> Vec<InitFile> {
    vec![
        InitFile {
            path: PathBuf::from(CONFIG_FILE),
            content: templates::MEND_TOML,
            description: "Configuration (editor, generative service, retry bounds)",
        },
        InitFile {
            path: Path::new(STATE_DIR).join(".gitignore"),
            content: templates::STATE_GITIGNORE,
            description: "Keeps cache and run records out of git",
        },
    ]
}

/// Writes every file that is missing, or every file with `force`.
fn init_project<E, D, W>(
    files: &[InitFile],
    force: bool,
    exists: E,
    create_dir: D,
    mut write_file: W,
) -> Result<Vec<(PathBuf, WriteResult)>>
where
    E: Fn(&Path) -> bool,
    D: Fn(&Path) -> Result<()>,
    W: FnMut(&Path, &str) -> Result<()>,
{
    let mut results = Vec::with_capacity(files.len());

    for file in files {
        let existed = exists(&file.path);
        if existed && !force {
            results.push((file.path.clone(), WriteResult::Skipped));
            continue;
        }

        if let Some(parent) = file.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }
        write_file(&file.path, file.content)?;

        let result = if existed {
            WriteResult::Overwritten
        } else {
            WriteResult::Created
        };
        results.push((file.path.clone(), result));
    }

    Ok(results)
}

fn format_results(results: &[(PathBuf, WriteResult)], files: &[InitFile]) -> String {
    let mut out = String::new();

    let _ = writeln!(&mut out, "\n{} mend initialized\n", "✓".green().bold());

    for (path, result) in results {
        let desc = files
            .iter()
            .find(|f| &f.path == path)
            .map_or("", |f| f.description);

        let _ = match result {
            WriteResult::Created => {
                writeln!(&mut out, "  {} - {}", path.display().to_string().cyan(), desc)
            }
            WriteResult::Overwritten => {
                writeln!(&mut out, "  {} {} (overwritten)", "↻".blue(), path.display())
            }
            WriteResult::Skipped => writeln!(
                &mut out,
                "  {} {} (already exists, use --force to overwrite)",
                "⊘".yellow(),
                path.display()
            ),
        };
    }

    let _ = writeln!(&mut out, "\n{}", "Next steps:".yellow().bold());
    let _ = writeln!(
        &mut out,
        "  1. Pick an editor and model in {}",
        CONFIG_FILE.cyan()
    );
    let _ = writeln!(
        &mut out,
        "  2. Export the API key named by {}",
        "[llm].api_key_env".cyan()
    );
    let _ = writeln!(
        &mut out,
        "  3. Run {}",
        "mend run \"<requirement>\"".green()
    );

    out
}
