//! mend: apply a natural-language requirement to a repository, then hold
//! the result to the project's own build, lint and test commands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod analysis;
mod commands;
mod config;
mod editor;
mod error;
mod install;
mod llm;
mod project;
mod runner;
mod selection;
mod state;
mod templates;
mod vcs;
mod workflow;

#[derive(Parser)]
#[command(name = "mend")]
#[command(
    author,
    version,
    about = "Requirement-driven code edits, verified by compile, lint and test loops"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a requirement to the project in the current directory
    Run {
        /// What the change should do, in plain language
        requirement: String,

        /// Pick one project when several are detected
        #[arg(short, long)]
        project: Option<String>,

        /// Code editor, aider or claude (overrides mend.toml)
        #[arg(short, long)]
        editor: Option<String>,

        /// Skip the generation cache for this run
        #[arg(long)]
        no_cache: bool,
    },

    /// Write a default mend.toml
    Init {
        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Show the outcome of the last run
    Status,

    /// Remove the generation cache, run record and logs
    Clean {
        /// Also remove mend.toml and the .mend directory
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("mend=debug")
    } else {
        EnvFilter::new("mend=info")
    };

    // Only runs leave a log behind; the other commands must not create `.mend`.
    let log_dir = if matches!(cli.command, Commands::Run { .. }) {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Some(state::ensure_state_dir(&cwd)?)
    } else {
        None
    };

    let (file_layer, _guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, state::LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            requirement,
            project,
            editor,
            no_cache,
        } => {
            commands::run::run(commands::run::RunOptions {
                requirement,
                project,
                editor,
                no_cache,
            })
            .await?;
        }
        Commands::Init { force } => {
            commands::init::run(force)?;
        }
        Commands::Status => {
            commands::status::run()?;
        }
        Commands::Clean { all } => {
            commands::clean::run(all)?;
        }
    }

    Ok(())
}
