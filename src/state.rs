//! Record of the last workflow run, kept at `.mend/last-run.toml`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::Diagnosis;
use crate::templates;

/// Directory holding state, cache and logs.
pub(crate) const STATE_DIR: &str = ".mend";

pub(crate) const RUN_RECORD_FILE: &str = ".mend/last-run.toml";

pub(crate) const LOG_FILE: &str = "mend.log";

/// Creates the state directory with a `.gitignore` that hides it from git.
///
/// Non-committing editors are followed by `git add -A`, which would
/// otherwise pick up the cache and logs.
pub(crate) fn ensure_state_dir(repo_dir: &Path) -> Result<PathBuf> {
    let dir = repo_dir.join(STATE_DIR);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let ignore = dir.join(".gitignore");
    if !ignore.exists() {
        fs::write(&ignore, templates::STATE_GITIGNORE)
            .with_context(|| format!("Failed to write {}", ignore.display()))?;
    }
    Ok(dir)
}

/// Result of one workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum StageOutcome {
    Passed,
    /// Compile gate only: the workflow stops here.
    ExhaustedAborted,
    /// Static analysis and tests: logged, then the workflow moves on.
    ExhaustedTolerated,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::ExhaustedAborted => write!(f, "exhausted (aborted)"),
            Self::ExhaustedTolerated => write!(f, "exhausted (tolerated)"),
        }
    }
}

/// What a workflow run did. Stages left as `None` never ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RunRecord {
    pub run_id: String,
    pub requirement: String,
    pub project: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub compile: Option<StageOutcome>,
    pub static_analysis: Option<StageOutcome>,
    pub test: Option<StageOutcome>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Last test-stage diagnosis. Informational only.
    pub test_diagnosis: Option<Diagnosis>,
}

impl RunRecord {
    pub fn new(run_id: impl Into<String>, requirement: &str, project: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            requirement: requirement.to_string(),
            project: project.to_string(),
            started_at: now,
            finished_at: now,
            compile: None,
            static_analysis: None,
            test: None,
            files: Vec::new(),
            test_diagnosis: None,
        }
    }

    /// True once the compile gate passed.
    pub fn compiled(&self) -> bool {
        self.compile == Some(StageOutcome::Passed)
    }

    pub fn load(repo_dir: &Path) -> Result<Option<Self>> {
        let path = repo_dir.join(RUN_RECORD_FILE);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read run record: {}", path.display()))?;
        let record = toml::from_str(&content)
            .with_context(|| format!("Failed to parse run record: {}", path.display()))?;

        Ok(Some(record))
    }

    pub fn save(&self, repo_dir: &Path) -> Result<()> {
        let path = repo_dir.join(RUN_RECORD_FILE);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize run record")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write run record: {}", path.display()))?;

        Ok(())
    }
}
