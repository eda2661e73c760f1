//! Mock editor for testing.
//!
//! Returns scripted outcomes and records every request for assertions,
//! so the workflow loops can be driven end to end without a real editor.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{CodeEditor, EditContext, Stage};

/// A single scripted edit outcome.
#[derive(Debug, Clone)]
pub(crate) enum MockEdit {
    /// The edit succeeds.
    Success,
    /// The edit fails with the given output.
    Failure(String),
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub(crate) struct EditCall {
    pub stage: Stage,
    pub round: u32,
    pub request: String,
    pub files: Vec<PathBuf>,
}

/// A mock editor. Cycles through its outcomes if invoked more often than scripted.
#[derive(Debug, Clone)]
pub(crate) struct MockEditor {
    outcomes: Arc<Vec<MockEdit>>,
    calls: Arc<Mutex<Vec<EditCall>>>,
    commits: bool,
}

impl MockEditor {
    pub fn new(outcomes: Vec<MockEdit>) -> Self {
        Self {
            outcomes: Arc::new(outcomes),
            calls: Arc::new(Mutex::new(Vec::new())),
            commits: true,
        }
    }

    /// An editor whose every edit succeeds.
    pub fn always_succeed() -> Self {
        Self::new(vec![MockEdit::Success])
    }

    /// Makes the mock report that it does not commit its own changes.
    pub fn without_commits(mut self) -> Self {
        self.commits = false;
        self
    }

    pub fn calls(&self) -> Vec<EditCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stage: Stage) -> Vec<EditCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.stage == stage)
            .collect()
    }
}

#[async_trait]
impl CodeEditor for MockEditor {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn commits_changes(&self) -> bool {
        self.commits
    }

    async fn edit(&self, ctx: &EditContext, request: &str, files: &[PathBuf]) -> Result<()> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(EditCall {
                stage: ctx.stage,
                round: ctx.round,
                request: request.to_string(),
                files: files.to_vec(),
            });
            calls.len() - 1
        };

        match &self.outcomes[index % self.outcomes.len()] {
            MockEdit::Success => Ok(()),
            MockEdit::Failure(output) => anyhow::bail!("{output}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use uuid::Uuid;

    fn ctx(stage: Stage, round: u32) -> EditContext {
        EditContext::new(Uuid::new_v4(), stage, round, Path::new("/tmp"))
    }

    #[tokio::test]
    async fn test_mock_editor_records_calls() {
        let editor = MockEditor::always_succeed();
        editor
            .edit(&ctx(Stage::Compile, 1), "req", &[PathBuf::from("a.rs")])
            .await
            .unwrap();

        let calls = editor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].request, "req");
        assert_eq!(calls[0].files, vec![PathBuf::from("a.rs")]);
        assert_eq!(editor.calls_for(Stage::Test).len(), 0);
    }

    #[tokio::test]
    async fn test_mock_editor_cycles_outcomes() {
        let editor = MockEditor::new(vec![
            MockEdit::Failure("boom".to_string()),
            MockEdit::Success,
        ]);

        let first = editor.edit(&ctx(Stage::Test, 1), "", &[]).await;
        let second = editor.edit(&ctx(Stage::Test, 2), "", &[]).await;
        let third = editor.edit(&ctx(Stage::Test, 3), "", &[]).await;

        assert!(first.unwrap_err().to_string().contains("boom"));
        assert!(second.is_ok());
        assert!(third.is_err());
    }
}
