//! Claude Code editor
//!
//! Invokes the Claude CLI in print mode:
//! ```bash
//! claude -p --dangerously-skip-permissions --model opus --output-format text
//! ```
//!
//! The request and the list of files to focus on are piped via stdin.
//! Claude does not commit, so the workflow commits after a successful edit.
//!
//! See: https://docs.anthropic.com/en/docs/claude-code

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{CodeEditor, EditContext};
use crate::config::ClaudeConfig;

/// Claude Code CLI editor
pub(crate) struct ClaudeEditor {
    config: ClaudeConfig,
}

impl ClaudeEditor {
    pub fn new(config: ClaudeConfig) -> Self {
        Self { config }
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-p".to_string()];

        if self.config.skip_permissions {
            args.push("--dangerously-skip-permissions".to_string());
        }

        if let Some(ref model) = self.config.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        args.push("--output-format".to_string());
        args.push(self.config.output_format.clone());
        args
    }
}

/// Renders the stdin prompt: the request followed by the files in scope.
fn build_prompt(request: &str, files: &[PathBuf]) -> String {
    let mut prompt = request.trim_end().to_string();
    if !files.is_empty() {
        prompt.push_str("\n\nLimit your changes to these files, creating new ones only when needed:\n");
        for file in files {
            let _ = writeln!(prompt, "- {}", file.display());
        }
    }
    prompt
}

#[async_trait]
impl CodeEditor for ClaudeEditor {
    fn name(&self) -> &'static str {
        "Claude"
    }

    fn commits_changes(&self) -> bool {
        false
    }

    async fn edit(&self, ctx: &EditContext, request: &str, files: &[PathBuf]) -> Result<()> {
        let claude_path = &self.config.path;
        info!(
            run_id = %ctx.run_id,
            stage = %ctx.stage,
            round = ctx.round,
            "Running Claude on {} file(s)",
            files.len()
        );

        let args = self.build_args();
        debug!("Claude args: {:?}", args);

        let mut child = tokio::process::Command::new(claude_path)
            .current_dir(&ctx.working_dir)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to run Claude '{}'. \n\
                     \n\
                     Make sure Claude Code CLI is installed:\n\
                     - Install: npm install -g @anthropic-ai/claude-code\n\
                     \n\
                     Configure the path in mend.toml:\n\
                     [editor.claude]\n\
                     path = \"/full/path/to/claude\"",
                    claude_path
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(build_prompt(request, files).as_bytes())
                .await?;
            stdin.flush().await?;
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);

            warn!("Claude stderr: {}", stderr);
            anyhow::bail!(
                "Claude failed with exit code {:?}:\n{}\n{}",
                output.status.code(),
                stdout.trim_end(),
                stderr.trim_end()
            );
        }

        debug!("Output length: {} bytes", output.stdout.len());
        info!("Claude edit completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_editor_name() {
        let editor = ClaudeEditor::new(ClaudeConfig::default());
        assert_eq!(editor.name(), "Claude");
        assert!(!editor.commits_changes());
    }

    #[test]
    fn test_build_args() {
        let config = ClaudeConfig {
            model: Some("opus".to_string()),
            ..ClaudeConfig::default()
        };
        let args = ClaudeEditor::new(config).build_args();
        assert_eq!(
            args,
            vec![
                "-p",
                "--dangerously-skip-permissions",
                "--model",
                "opus",
                "--output-format",
                "text"
            ]
        );
    }

    #[test]
    fn test_build_prompt_lists_files() {
        let prompt = build_prompt(
            "Fix the build\n",
            &[PathBuf::from("src/lib.rs"), PathBuf::from("src/main.rs")],
        );
        assert!(prompt.starts_with("Fix the build\n\nLimit your changes"));
        assert!(prompt.contains("- src/lib.rs\n- src/main.rs\n"));
    }

    #[test]
    fn test_build_prompt_without_files() {
        assert_eq!(build_prompt("Do it", &[]), "Do it");
    }
}
