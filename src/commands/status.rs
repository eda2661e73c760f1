use anyhow::{Context, Result};
use colored::Colorize;

use super::run::format::format_record;
use crate::state::RunRecord;

/// Prints the record of the last run.
pub(crate) fn run() -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    match RunRecord::load(&cwd)? {
        Some(record) => {
            println!("{}", "   🔧 Last mend run".yellow().bold());
            print!("{}", format_record(&record));
        }
        None => {
            println!("\n{} No mend run recorded here.", "ℹ".blue());
            println!("  Run {} to start one.", "mend run \"<requirement>\"".green());
        }
    }

    Ok(())
}
