//! Build, lint and test command execution.
//!
//! Commands are parsed with `shell-words` so quoted arguments survive,
//! e.g. `sh -c "npm run build && npm run typecheck"`.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::error::WorkflowError;

/// Exit status and captured output of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandResult {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// Builds a result for a command that never started.
    pub fn not_started(command: &str, reason: &str) -> Self {
        Self {
            command: command.to_string(),
            exit_code: -1,
            stdout: String::new(),
            stderr: reason.to_string(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Renders stdout and stderr together as diagnostic text.
    pub fn combined_output(&self) -> String {
        let mut out = format!("`{}` exited with {}", self.command, self.exit_code);
        for stream in [&self.stdout, &self.stderr] {
            let trimmed = stream.trim_end();
            if !trimmed.is_empty() {
                out.push('\n');
                out.push_str(trimmed);
            }
        }
        out
    }

    /// Converts into the uniform success / diagnostic-text contract.
    pub fn into_outcome(self) -> Result<(), String> {
        if self.success() {
            Ok(())
        } else {
            Err(self.combined_output())
        }
    }
}

/// Executes a named command in a working directory.
#[async_trait]
pub(crate) trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, working_dir: &Path) -> CommandResult;
}

/// Runs commands as child processes.
#[derive(Debug, Default, Clone)]
pub(crate) struct ShellCommandRunner;

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Splits a command string into program and arguments.
pub(crate) fn split_command(label: &str, command: &str) -> Result<Vec<String>, WorkflowError> {
    let parts = shell_words::split(command)
        .map_err(|e| WorkflowError::invalid_command(label, e.to_string()))?;
    if parts.is_empty() {
        return Err(WorkflowError::empty_command(label));
    }
    Ok(parts)
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str, working_dir: &Path) -> CommandResult {
        debug!("Running `{}` in {}", command, working_dir.display());

        let parts = match split_command("configured", command) {
            Ok(parts) => parts,
            Err(e) => return CommandResult::not_started(command, &e.to_string()),
        };
        let (program, args) = parts.split_at(1);

        let output = match tokio::process::Command::new(&program[0])
            .current_dir(working_dir)
            .args(args)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return CommandResult::not_started(
                    command,
                    &format!("Failed to run `{}`: {e}", program[0]),
                )
            }
        };

        let result = CommandResult {
            command: command.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if result.success() {
            info!("`{}` passed", command);
        } else {
            debug!("`{}` failed with exit code {}", command, result.exit_code);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_simple_command() {
        let cwd = std::env::current_dir().unwrap();
        let result = ShellCommandRunner::new().run("true", &cwd).await;
        assert!(result.success());
        assert!(result.into_outcome().is_ok());
    }

    #[tokio::test]
    async fn test_run_quoted_args() {
        let cwd = std::env::current_dir().unwrap();
        let result = ShellCommandRunner::new()
            .run("sh -c \"echo out && echo err >&2 && exit 3\"", &cwd)
            .await;
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");

        let text = result.into_outcome().unwrap_err();
        assert!(text.starts_with("`sh -c \"echo out && echo err >&2 && exit 3\"` exited with 3"));
        assert!(text.contains("\nout\nerr"));
    }

    #[tokio::test]
    async fn test_run_empty_command_is_failure() {
        let cwd = std::env::current_dir().unwrap();
        let result = ShellCommandRunner::new().run("", &cwd).await;
        assert!(!result.success());
        assert!(result.stderr.contains("cannot be empty"));
    }

    #[tokio::test]
    async fn test_run_unmatched_quote_is_failure() {
        let cwd = std::env::current_dir().unwrap();
        let result = ShellCommandRunner::new().run("sh -c \"unclosed", &cwd).await;
        assert!(!result.success());
        assert!(result.stderr.contains("parse"));
    }

    #[tokio::test]
    async fn test_run_missing_program_is_failure() {
        let cwd = std::env::current_dir().unwrap();
        let result = ShellCommandRunner::new()
            .run("definitely-not-a-real-binary-0xdead", &cwd)
            .await;
        assert_eq!(result.exit_code, -1);
        assert!(result.combined_output().contains("Failed to run"));
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("test", "sh -c \"a && b\"").unwrap(),
            vec!["sh", "-c", "a && b"]
        );
        assert!(split_command("test", "   ").is_err());
    }
}
