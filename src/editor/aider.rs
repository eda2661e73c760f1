//! Aider editor
//!
//! Invokes aider non-interactively with the files to edit:
//! ```bash
//! aider --yes-always --no-stream --no-check-update --message "request" src/a.rs src/b.rs
//! ```
//!
//! Aider commits its own changes, so the workflow can read the files an edit
//! introduced from the last commit.
//!
//! See: https://aider.chat/docs/scripting.html

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{CodeEditor, EditContext};
use crate::config::AiderConfig;

/// Aider CLI editor
pub(crate) struct AiderEditor {
    config: AiderConfig,
}

impl AiderEditor {
    pub fn new(config: AiderConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, request: &str, files: &[PathBuf]) -> Vec<String> {
        let mut args = vec![
            "--yes-always".to_string(),
            "--no-stream".to_string(),
            "--no-check-update".to_string(),
            "--no-show-release-notes".to_string(),
        ];

        if let Some(ref model) = self.config.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        args.extend(self.config.extra_args.iter().cloned());

        args.push("--message".to_string());
        args.push(request.to_string());

        args.extend(files.iter().map(|f| f.display().to_string()));
        args
    }
}

#[async_trait]
impl CodeEditor for AiderEditor {
    fn name(&self) -> &'static str {
        "Aider"
    }

    fn commits_changes(&self) -> bool {
        true
    }

    async fn edit(&self, ctx: &EditContext, request: &str, files: &[PathBuf]) -> Result<()> {
        let aider_path = &self.config.path;
        info!(
            run_id = %ctx.run_id,
            stage = %ctx.stage,
            round = ctx.round,
            "Running aider on {} file(s)",
            files.len()
        );
        debug!("Working dir: {}", ctx.working_dir.display());

        let args = self.build_args(request, files);
        debug!("Aider args: {:?}", args);

        let output = tokio::process::Command::new(aider_path)
            .current_dir(&ctx.working_dir)
            .args(&args)
            .output()
            .await
            .with_context(|| {
                format!(
                    "Failed to run aider '{}'. \n\
                     \n\
                     Make sure aider is installed:\n\
                     - Install: python -m pip install aider-install && aider-install\n\
                     \n\
                     Configure the path in mend.toml:\n\
                     [editor.aider]\n\
                     path = \"/full/path/to/aider\"",
                    aider_path
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);

            warn!("Aider stderr: {}", stderr);
            anyhow::bail!(
                "Aider failed with exit code {:?}:\n{}\n{}",
                output.status.code(),
                stdout.trim_end(),
                stderr.trim_end()
            );
        }

        info!("Aider edit completed");
        Ok(())
    }
}
