//! Steps shared by the repair loops.
//!
//! Every step folds failure into diagnostic text: commands via
//! `CommandResult::into_outcome`, edits via the editor error's message.

use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::files::WorkingFileSet;
use super::WorkflowDeps;
use crate::analysis::Diagnosis;
use crate::editor::{EditContext, Stage};
use crate::project::ProjectInfo;

/// One workflow run against one project.
pub(super) struct Session<'a> {
    pub deps: &'a WorkflowDeps,
    pub project: &'a ProjectInfo,
    pub run_id: Uuid,
}

impl Session<'_> {
    pub async fn run_command(&self, command: &str) -> Result<(), String> {
        self.deps
            .runner
            .run(command, &self.project.base_dir)
            .await
            .into_outcome()
    }

    pub async fn compile(&self) -> Result<(), String> {
        self.run_command(&self.project.compile_command).await
    }

    /// Runs one edit, committing afterwards if the editor does not.
    pub async fn edit(
        &self,
        stage: Stage,
        round: u32,
        request: &str,
        files: &[PathBuf],
    ) -> Result<(), String> {
        let ctx = EditContext::new(self.run_id, stage, round, &self.deps.repo_root);
        let editor = &self.deps.editor;

        info!(
            stage = %stage,
            round,
            files = files.len(),
            "Requesting edit from {}",
            editor.name()
        );

        editor
            .edit(&ctx, request, files)
            .await
            .map_err(|e| format!("{} edit failed: {e:#}", editor.name()))?;

        if !editor.commits_changes() {
            let message = self.commit_message(stage, round);
            if let Err(e) = self.deps.vcs.commit_all(&message).await {
                warn!("Failed to commit edit: {e:#}");
            }
        }
        Ok(())
    }

    /// Adds the files introduced by the latest commit.
    pub async fn merge_added_files(&self, files: &mut WorkingFileSet) {
        match self.deps.vcs.files_added_in_last_commit().await {
            Ok(added) => {
                let count = files.merge(added);
                if count > 0 {
                    debug!("Edit added {} file(s) to the working set", count);
                }
            }
            Err(e) => warn!("Could not list files added by the edit: {e:#}"),
        }
    }

    /// Installs the packages a diagnosis names and merges its files.
    pub async fn apply(&self, diagnosis: &Diagnosis, files: &mut WorkingFileSet) {
        for package in &diagnosis.packages {
            self.deps
                .installer
                .install_package(self.project, package)
                .await;
        }
        files.merge(diagnosis.files.iter().cloned());
    }

    pub async fn analyze(&self, diagnostic: &str, files: &WorkingFileSet) -> Diagnosis {
        self.deps
            .analyzer
            .analyze(diagnostic, files.as_slice())
            .await
    }

    pub async fn commit_tracked(&self, stage: Stage, round: u32) {
        let message = self.commit_message(stage, round);
        if let Err(e) = self.deps.vcs.commit_all_tracked(&message).await {
            warn!("Failed to commit {} changes: {e:#}", stage);
        }
    }

    fn commit_message(&self, stage: Stage, round: u32) -> String {
        format!(
            "{} {} round {} ({})",
            self.deps.settings.commit_message_prefix, stage, round, self.project.name
        )
    }
}

/// Appends a fenced block of diagnostic output to a request.
pub(super) fn with_diagnostic(mut request: String, heading: &str, diagnostic: &str) -> String {
    request.push_str("\n\n");
    request.push_str(heading);
    request.push_str("\n```\n");
    request.push_str(diagnostic.trim());
    request.push_str("\n```\n");
    request
}
