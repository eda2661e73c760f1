//! Scripted collaborators for driving the workflow in tests.
//!
//! Each fake is `Clone` over shared state: one copy goes into
//! `WorkflowDeps`, the test keeps the other to inspect what happened.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::WorkflowDeps;
use crate::analysis::{Diagnosis, ErrorAnalyzer, FileNameExtractor};
use crate::config::WorkflowConfig;
use crate::editor::mock::MockEditor;
use crate::install::PackageInstaller;
use crate::llm::TextGenerator;
use crate::project::{ProjectDetector, ProjectInfo};
use crate::runner::{CommandResult, CommandRunner};
use crate::selection::{FileSelector, SelectedFiles};
use crate::vcs::VersionControl;

pub(crate) fn project(compile: &str, test: Option<&str>, lint: Option<&str>) -> ProjectInfo {
    ProjectInfo {
        name: "app".to_string(),
        base_dir: PathBuf::from("/repo/app"),
        compile_command: compile.to_string(),
        test_command: test.map(String::from),
        lint_command: lint.map(String::from),
        install_command: Some("install {package}".to_string()),
    }
}

pub(crate) fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

/// Runner with per-command scripted outcomes.
///
/// The last scripted outcome repeats; unscripted commands succeed.
#[derive(Clone, Default)]
pub(crate) struct ScriptedRunner {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Result<(), String>>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn script(self, command: &str, outcomes: Vec<Result<(), &str>>) -> Self {
        let outcomes = outcomes
            .into_iter()
            .map(|o| o.map_err(String::from))
            .collect();
        self.scripts
            .lock()
            .unwrap()
            .insert(command.to_string(), outcomes);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| *c == command).count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str, _working_dir: &Path) -> CommandResult {
        self.calls.lock().unwrap().push(command.to_string());

        let outcome = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(command) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap_or(Ok(())),
                None => Ok(()),
            }
        };

        match outcome {
            Ok(()) => CommandResult {
                command: command.to_string(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            },
            Err(output) => CommandResult {
                command: command.to_string(),
                exit_code: 1,
                stdout: output,
                stderr: String::new(),
            },
        }
    }
}

/// Version control that counts commits and reports scripted added files.
#[derive(Clone, Default)]
pub(crate) struct FakeVcs {
    added: Arc<Mutex<VecDeque<Vec<PathBuf>>>>,
    tracked_commits: Arc<Mutex<Vec<String>>>,
    full_commits: Arc<Mutex<Vec<String>>>,
}

impl FakeVcs {
    /// Each call to `files_added_in_last_commit` takes the next batch.
    pub fn with_added(self, batches: Vec<Vec<PathBuf>>) -> Self {
        *self.added.lock().unwrap() = batches.into();
        self
    }

    pub fn tracked_commits(&self) -> Vec<String> {
        self.tracked_commits.lock().unwrap().clone()
    }

    pub fn full_commits(&self) -> Vec<String> {
        self.full_commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn files_added_in_last_commit(&self) -> Result<Vec<PathBuf>> {
        Ok(self.added.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn commit_all_tracked(&self, message: &str) -> Result<()> {
        self.tracked_commits
            .lock()
            .unwrap()
            .push(message.to_string());
        Ok(())
    }

    async fn commit_all(&self, message: &str) -> Result<()> {
        self.full_commits.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn tracked_files(&self, _dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

/// Analyzer returning scripted diagnoses in call order, then empty ones.
#[derive(Clone, Default)]
pub(crate) struct ScriptedAnalyzer {
    diagnoses: Arc<Mutex<VecDeque<Diagnosis>>>,
    calls: Arc<Mutex<Vec<(String, Vec<PathBuf>)>>>,
}

impl ScriptedAnalyzer {
    pub fn with(self, diagnoses: Vec<Diagnosis>) -> Self {
        *self.diagnoses.lock().unwrap() = diagnoses.into();
        self
    }

    /// `(diagnostic text, candidate files)` per call.
    pub fn calls(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, diagnostic: &str, candidates: &[PathBuf]) -> Diagnosis {
        self.calls
            .lock()
            .unwrap()
            .push((diagnostic.to_string(), candidates.to_vec()));
        self.diagnoses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
    }
}

/// Extractor answering every call with the same files.
#[derive(Clone, Default)]
pub(crate) struct FixedExtractor {
    files: Vec<PathBuf>,
    calls: Arc<Mutex<usize>>,
}

impl FixedExtractor {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl FileNameExtractor for FixedExtractor {
    async fn extract(&self, _diagnostic: &str, _known: &[PathBuf]) -> Vec<PathBuf> {
        *self.calls.lock().unwrap() += 1;
        self.files.clone()
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingInstaller {
    installed: Arc<Mutex<Vec<String>>>,
}

impl RecordingInstaller {
    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageInstaller for RecordingInstaller {
    async fn install_package(&self, _project: &ProjectInfo, name: &str) {
        self.installed.lock().unwrap().push(name.to_string());
    }
}

pub(crate) struct FixedDetector(pub Vec<ProjectInfo>);

impl ProjectDetector for FixedDetector {
    fn detect(&self) -> Result<Vec<ProjectInfo>> {
        Ok(self.0.clone())
    }
}

/// Selector with a fixed answer, or a failure when `None`.
pub(crate) struct FixedSelector(pub Option<SelectedFiles>);

#[async_trait]
impl FileSelector for FixedSelector {
    async fn select(&self, _requirement: &str, _project: &ProjectInfo) -> Result<SelectedFiles> {
        self.0
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no tracked files"))
    }
}

/// Generator answering `PLAN: <prompt's first line>`, or failing.
#[derive(Clone, Default)]
pub(crate) struct PlanGenerator {
    failing: bool,
    operations: Arc<Mutex<Vec<String>>>,
}

impl PlanGenerator {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for PlanGenerator {
    async fn generate_text(&self, operation: &str, prompt: &str) -> Result<String> {
        self.operations.lock().unwrap().push(operation.to_string());
        if self.failing {
            anyhow::bail!("service unavailable");
        }
        Ok(format!("PLAN: {}", prompt.lines().next().unwrap_or_default()))
    }
}

/// Every fake, plus a scratch repository root.
pub(crate) struct Harness {
    pub editor: MockEditor,
    pub runner: ScriptedRunner,
    pub vcs: FakeVcs,
    pub analyzer: ScriptedAnalyzer,
    pub extractor: FixedExtractor,
    pub installer: RecordingInstaller,
    pub generator: PlanGenerator,
    pub projects: Vec<ProjectInfo>,
    pub selected: Option<SelectedFiles>,
    pub repo: tempfile::TempDir,
}

impl Harness {
    pub fn new(project: ProjectInfo) -> Self {
        Self {
            editor: MockEditor::always_succeed(),
            runner: ScriptedRunner::default(),
            vcs: FakeVcs::default(),
            analyzer: ScriptedAnalyzer::default(),
            extractor: FixedExtractor::default(),
            installer: RecordingInstaller::default(),
            generator: PlanGenerator::default(),
            projects: vec![project],
            selected: Some(SelectedFiles {
                primary: paths(&["src/main.ts"]),
                secondary: paths(&["src/util.ts"]),
            }),
            repo: tempfile::tempdir().unwrap(),
        }
    }

    pub fn deps(&self) -> WorkflowDeps {
        WorkflowDeps {
            detector: Box::new(FixedDetector(self.projects.clone())),
            selector: Box::new(FixedSelector(self.selected.clone())),
            generator: Arc::new(self.generator.clone()),
            editor: Box::new(self.editor.clone()),
            runner: Arc::new(self.runner.clone()),
            analyzer: Box::new(self.analyzer.clone()),
            extractor: Box::new(self.extractor.clone()),
            vcs: Arc::new(self.vcs.clone()),
            installer: Box::new(self.installer.clone()),
            settings: WorkflowConfig::default(),
            repo_root: self.repo.path().to_path_buf(),
        }
    }
}
