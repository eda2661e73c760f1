//! Initial file selection for a requirement.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::llm::{generate_json, string_array, TextGenerator};
use crate::project::ProjectInfo;
use crate::vcs::VersionControl;

/// Upper bound on the file listing sent to the service.
const MAX_LISTED_FILES: usize = 800;

/// Files chosen for the first edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectedFiles {
    /// Files the requirement most likely touches.
    pub primary: Vec<PathBuf>,
    /// Supporting files worth having in view.
    pub secondary: Vec<PathBuf>,
}

impl SelectedFiles {
    /// Primary files followed by secondary ones.
    pub fn into_ordered(self) -> Vec<PathBuf> {
        let mut all = self.primary;
        all.extend(self.secondary);
        all
    }
}

#[async_trait]
pub(crate) trait FileSelector: Send + Sync {
    async fn select(&self, requirement: &str, project: &ProjectInfo) -> Result<SelectedFiles>;
}

/// Picks files from the tracked file list with the generative service.
pub(crate) struct LlmFileSelector {
    generator: Arc<dyn TextGenerator>,
    vcs: Arc<dyn VersionControl>,
}

impl LlmFileSelector {
    pub fn new(generator: Arc<dyn TextGenerator>, vcs: Arc<dyn VersionControl>) -> Self {
        Self { generator, vcs }
    }

    fn prompt(requirement: &str, project: &ProjectInfo, tracked: &[PathBuf]) -> String {
        let mut prompt = format!(
            "You are choosing which files of the project `{}` to edit.\n\n\
             Requirement:\n{}\n\nTracked files:\n",
            project.name, requirement
        );
        for file in tracked.iter().take(MAX_LISTED_FILES) {
            let _ = writeln!(prompt, "{}", file.display());
        }
        if tracked.len() > MAX_LISTED_FILES {
            let _ = writeln!(prompt, "... and {} more", tracked.len() - MAX_LISTED_FILES);
        }
        prompt.push_str(
            "\nReturn {\"primary\": [...], \"secondary\": [...]}. Primary files must change to \
             satisfy the requirement; secondary files give context (types, callers, tests). \
             Use paths exactly as listed.",
        );
        prompt
    }
}

/// Keeps tracked paths only, in answer order, each path once.
fn keep_tracked(names: Vec<String>, tracked: &[PathBuf], seen: &mut Vec<PathBuf>) -> Vec<PathBuf> {
    let mut kept = Vec::new();
    for name in names {
        let path = PathBuf::from(name.trim_start_matches("./"));
        if tracked.contains(&path) && !seen.contains(&path) {
            seen.push(path.clone());
            kept.push(path);
        }
    }
    kept
}

#[async_trait]
impl FileSelector for LlmFileSelector {
    async fn select(&self, requirement: &str, project: &ProjectInfo) -> Result<SelectedFiles> {
        let tracked = self
            .vcs
            .tracked_files(&project.base_dir)
            .await
            .context("Failed to list tracked files")?;
        debug!("{} tracked file(s) under {}", tracked.len(), project.base_dir.display());

        let value = generate_json(
            self.generator.as_ref(),
            "select_files",
            &Self::prompt(requirement, project, &tracked),
        )
        .await?;

        let mut seen = Vec::new();
        let primary = keep_tracked(string_array(&value, "primary"), &tracked, &mut seen);
        let secondary = keep_tracked(string_array(&value, "secondary"), &tracked, &mut seen);

        info!(
            primary = primary.len(),
            secondary = secondary.len(),
            "Selected files"
        );
        Ok(SelectedFiles { primary, secondary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate_text(&self, operation: &str, _prompt: &str) -> Result<String> {
            assert_eq!(operation, "select_files");
            Ok(self.0.to_string())
        }
    }

    struct Tracked(Vec<&'static str>);

    #[async_trait]
    impl VersionControl for Tracked {
        async fn files_added_in_last_commit(&self) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        async fn commit_all_tracked(&self, _message: &str) -> Result<()> {
            Ok(())
        }
        async fn commit_all(&self, _message: &str) -> Result<()> {
            Ok(())
        }
        async fn tracked_files(&self, _dir: &Path) -> Result<Vec<PathBuf>> {
            Ok(self.0.iter().map(PathBuf::from).collect())
        }
    }

    fn project() -> ProjectInfo {
        ProjectInfo {
            name: "web".to_string(),
            base_dir: PathBuf::from("/repo/web"),
            compile_command: "npm run build".to_string(),
            test_command: None,
            lint_command: None,
            install_command: None,
        }
    }

    #[tokio::test]
    async fn test_select_keeps_only_tracked_paths_in_order() {
        let selector = LlmFileSelector::new(
            Arc::new(Canned(
                r#"{"primary": ["web/src/b.ts", "ghost.ts", "./web/src/a.ts"],
                    "secondary": ["web/src/a.ts", "web/src/types.ts"]}"#,
            )),
            Arc::new(Tracked(vec!["web/src/a.ts", "web/src/b.ts", "web/src/types.ts"])),
        );

        let selected = selector.select("add dark mode", &project()).await.unwrap();

        assert_eq!(
            selected.primary,
            vec![PathBuf::from("web/src/b.ts"), PathBuf::from("web/src/a.ts")]
        );
        assert_eq!(selected.secondary, vec![PathBuf::from("web/src/types.ts")]);
        assert_eq!(selected.into_ordered().len(), 3);
    }

    #[tokio::test]
    async fn test_select_propagates_malformed_answer() {
        let selector = LlmFileSelector::new(
            Arc::new(Canned("I would edit the main file")),
            Arc::new(Tracked(vec!["main.go"])),
        );
        assert!(selector.select("x", &project()).await.is_err());
    }

    #[test]
    fn test_prompt_truncates_long_listings() {
        let tracked: Vec<PathBuf> = (0..MAX_LISTED_FILES + 5)
            .map(|i| PathBuf::from(format!("f{i}.rs")))
            .collect();
        let prompt = LlmFileSelector::prompt("req", &project(), &tracked);
        assert!(prompt.contains("... and 5 more"));
        assert!(!prompt.contains(&format!("f{}.rs", MAX_LISTED_FILES + 1)));
    }
}
