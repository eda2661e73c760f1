//! The verify-and-repair workflow.
//!
//! Sequencing, stage by stage:
//! - `compile`: edit + compile, the gate; exhaustion stops the run
//! - `static_analysis`: lint repair, tolerated on exhaustion, only with a lint command
//! - `test_loop`: test authoring and repair, only with a test command
//!
//! Every external call is awaited before the next step. Rounds never
//! overlap because each one mutates the same working tree and history.

mod compile;
#[cfg(test)]
pub(crate) mod fakes;
mod files;
mod session;
mod static_analysis;
mod test_loop;

pub(crate) use files::WorkingFileSet;

use anyhow::Result;
use chrono::Utc;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::analysis::{ErrorAnalyzer, FileNameExtractor};
use crate::config::WorkflowConfig;
use crate::editor::{CodeEditor, Stage};
use crate::error::WorkflowError;
use crate::install::PackageInstaller;
use crate::llm::TextGenerator;
use crate::project::{filter_candidates, ProjectDetector, ProjectInfo};
use crate::runner::CommandRunner;
use crate::selection::FileSelector;
use crate::state::{RunRecord, StageOutcome};
use crate::vcs::VersionControl;
use session::Session;

/// File contents beyond this many bytes are cut from the planning prompt.
const MAX_FILE_BYTES: usize = 16_000;
/// Total file content budget for the planning prompt.
const MAX_CONTEXT_BYTES: usize = 120_000;

/// Collaborators the workflow drives. Injected so tests can script them.
pub(crate) struct WorkflowDeps {
    pub detector: Box<dyn ProjectDetector>,
    pub selector: Box<dyn FileSelector>,
    pub generator: Arc<dyn TextGenerator>,
    pub editor: Box<dyn CodeEditor>,
    pub runner: Arc<dyn CommandRunner>,
    pub analyzer: Box<dyn ErrorAnalyzer>,
    pub extractor: Box<dyn FileNameExtractor>,
    pub vcs: Arc<dyn VersionControl>,
    pub installer: Box<dyn PackageInstaller>,
    pub settings: WorkflowConfig,
    /// Repository root: editors run here and the run record lands here.
    pub repo_root: PathBuf,
}

/// What to run the workflow on.
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkflowRequest {
    pub requirement: String,
    /// Skips detection when set.
    pub project: Option<ProjectInfo>,
    /// Narrows detected candidates by name or directory.
    pub project_filter: Option<String>,
}

/// Resolves the single project to work on.
pub(crate) fn resolve_project(
    detector: &dyn ProjectDetector,
    filter: Option<&str>,
) -> Result<ProjectInfo> {
    let candidates = filter_candidates(detector.detect()?, filter);
    let [project] = <[ProjectInfo; 1]>::try_from(candidates).map_err(|candidates| {
        WorkflowError::detection_ambiguity(candidates.into_iter().map(|p| p.name).collect())
    })?;
    Ok(project)
}

/// Runs the whole workflow and returns its record.
///
/// Fails only when the project cannot be resolved. Every other failure is
/// absorbed by the stage loops and shows up in the record.
pub(crate) async fn run_code_edit_workflow(
    deps: &WorkflowDeps,
    request: WorkflowRequest,
) -> Result<RunRecord> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("workflow", %run_id);
    run_workflow(deps, request, run_id).instrument(span).await
}

async fn run_workflow(
    deps: &WorkflowDeps,
    request: WorkflowRequest,
    run_id: Uuid,
) -> Result<RunRecord> {
    let WorkflowRequest {
        requirement,
        project,
        project_filter,
    } = request;

    let project = match project {
        Some(project) => project,
        None => resolve_project(deps.detector.as_ref(), project_filter.as_deref())?,
    };
    info!(
        event = "workflow_start",
        project = %project.name,
        base_dir = %project.base_dir.display(),
    );

    let mut record = RunRecord::new(run_id.to_string(), &requirement, &project.name);
    let session = Session {
        deps,
        project: &project,
        run_id,
    };

    let selected = match deps.selector.select(&requirement, &project).await {
        Ok(selected) => selected.into_ordered(),
        Err(e) => {
            warn!("File selection failed, starting with no files: {e:#}");
            Vec::new()
        }
    };
    let mut files = WorkingFileSet::new(selected);

    let plan = draft_plan(
        deps.generator.as_ref(),
        &requirement,
        files.as_slice(),
        &deps.repo_root,
    )
    .await;

    stage_start(Stage::Compile);
    let compiled = session.edit_compile_loop(&plan, &mut files).await;
    stage_end(Stage::Compile, compiled);
    record.compile = Some(compiled);

    if compiled == StageOutcome::Passed {
        if let Some(lint) = project.lint_command.as_deref() {
            stage_start(Stage::StaticAnalysis);
            let outcome = session.static_analysis_loop(lint, &files).await;
            stage_end(Stage::StaticAnalysis, outcome);
            record.static_analysis = Some(outcome);
        }

        if let Some(test) = project.test_command.as_deref() {
            stage_start(Stage::Test);
            let diagnosis = session.test_loop(&requirement, test, &mut files).await;
            let outcome = if diagnosis.is_some() {
                StageOutcome::ExhaustedTolerated
            } else {
                StageOutcome::Passed
            };
            stage_end(Stage::Test, outcome);
            record.test = Some(outcome);
            record.test_diagnosis = diagnosis;
        }
    } else {
        warn!("Compile gate not satisfied, skipping static analysis and tests");
    }

    record.files = files.into_vec();
    record.finished_at = Utc::now();

    if let Err(e) = record.save(&deps.repo_root) {
        warn!("Failed to save run record: {e:#}");
    }

    info!(
        event = "workflow_end",
        compiled = record.compiled(),
        files = record.files.len(),
    );
    Ok(record)
}

fn stage_start(stage: Stage) {
    info!(event = "stage_start", stage = %stage);
}

fn stage_end(stage: Stage, outcome: StageOutcome) {
    info!(event = "stage_end", stage = %stage, outcome = %outcome);
}

/// Turns the requirement into a detailed plan for the editor.
///
/// One generative call. If it fails the requirement itself is the plan.
async fn draft_plan(
    generator: &dyn TextGenerator,
    requirement: &str,
    files: &[PathBuf],
    repo_root: &Path,
) -> String {
    let prompt = plan_prompt(requirement, files, repo_root);
    match generator.generate_text("implementation_plan", &prompt).await {
        Ok(plan) if !plan.trim().is_empty() => plan,
        Ok(_) => {
            warn!("Planning returned nothing, using the requirement as is");
            requirement.to_string()
        }
        Err(e) => {
            warn!("Planning failed, using the requirement as is: {e:#}");
            requirement.to_string()
        }
    }
}

fn plan_prompt(requirement: &str, files: &[PathBuf], repo_root: &Path) -> String {
    let mut prompt = format!(
        "Requirement:\n{requirement}\n\n\
         Write a detailed, step by step implementation plan for a code editing tool. \
         Name the functions, types and files to change and describe each change precisely. \
         Do not write the full code.\n"
    );

    let mut budget = MAX_CONTEXT_BYTES;
    for file in files {
        if budget == 0 {
            break;
        }
        let Ok(content) = std::fs::read_to_string(repo_root.join(file)) else {
            continue;
        };
        let mut end = content.len().min(MAX_FILE_BYTES).min(budget);
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            continue;
        }
        budget -= end;
        let _ = write!(
            prompt,
            "\n--- {} ---\n{}\n",
            file.display(),
            &content[..end]
        );
    }
    prompt
}
