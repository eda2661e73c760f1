//! Code editors for different AI CLI tools
//!
//! This module provides a unified interface for invoking code editing CLIs:
//! - Aider: `aider --yes-always --message "request" <files>`
//! - Claude: `claude -p --dangerously-skip-permissions` (request on stdin)
//!
//! The editor is selected via `[editor].provider` in mend.toml.

mod aider;
mod claude;
#[cfg(test)]
pub(crate) mod mock;

pub(crate) use aider::AiderEditor;
pub(crate) use claude::ClaudeEditor;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::EditorConfig;

/// Workflow stage an edit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Compile,
    StaticAnalysis,
    Test,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => write!(f, "compile"),
            Self::StaticAnalysis => write!(f, "static-analysis"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Context handed to every edit instead of ambient global state.
#[derive(Debug, Clone)]
pub(crate) struct EditContext {
    pub run_id: Uuid,
    pub stage: Stage,
    /// 1-based round within the stage.
    pub round: u32,
    /// Directory the editor runs in.
    pub working_dir: PathBuf,
}

impl EditContext {
    pub fn new(run_id: Uuid, stage: Stage, round: u32, working_dir: &Path) -> Self {
        Self {
            run_id,
            stage,
            round,
            working_dir: working_dir.to_path_buf(),
        }
    }
}

/// Trait for code editing tools.
///
/// An edit either succeeds or fails as a whole. The error message carries the
/// tool's combined output and is used verbatim as diagnostic text.
#[async_trait]
pub(crate) trait CodeEditor: Send + Sync {
    /// Returns the editor name for display.
    fn name(&self) -> &'static str;

    /// Whether the editor commits its own changes.
    fn commits_changes(&self) -> bool;

    /// Attempts to satisfy `request` by modifying `files`.
    async fn edit(&self, ctx: &EditContext, request: &str, files: &[PathBuf]) -> Result<()>;
}

/// Supported editors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Provider {
    /// Aider CLI.
    #[default]
    Aider,
    /// Claude Code CLI.
    Claude,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aider => write!(f, "aider"),
            Self::Claude => write!(f, "claude"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aider" => Ok(Self::Aider),
            "claude" => Ok(Self::Claude),
            _ => anyhow::bail!("Unknown editor: '{s}'. Supported: aider, claude"),
        }
    }
}

/// Builds the configured editor.
pub(crate) fn create_editor(provider: Provider, config: &EditorConfig) -> Box<dyn CodeEditor> {
    match provider {
        Provider::Aider => Box::new(AiderEditor::new(config.aider.clone())),
        Provider::Claude => Box::new(ClaudeEditor::new(config.claude.clone())),
    }
}

/// Resolves the editor to use.
/// Priority: CLI flag > `MEND_EDITOR` env var > config file.
pub(crate) fn resolve_provider(config: &EditorConfig, cli: Option<&str>) -> Result<Provider> {
    let env = std::env::var("MEND_EDITOR").ok();
    resolve_provider_with_env(config, cli, env.as_deref())
}

fn resolve_provider_with_env(
    config: &EditorConfig,
    cli: Option<&str>,
    env: Option<&str>,
) -> Result<Provider> {
    if let Some(p) = cli {
        return p.parse();
    }
    if let Some(p) = env.filter(|v| !v.is_empty()) {
        return p.parse();
    }
    config.get_provider()
}
