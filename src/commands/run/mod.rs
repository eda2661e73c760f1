//! `mend run`: apply a requirement to the repository in the current directory.
//!
//! Wires the concrete collaborators into `WorkflowDeps`:
//! - `format`: banner and run summary

pub(crate) mod format;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::analysis::{LlmErrorAnalyzer, LlmFileNameExtractor};
use crate::config::Config;
use crate::editor::{create_editor, resolve_provider, Provider};
use crate::install::CommandInstaller;
use crate::llm::{CachedGenerator, OpenAiCompatClient, TextGenerator};
use crate::project::MarkerDetector;
use crate::runner::{CommandRunner, ShellCommandRunner};
use crate::selection::LlmFileSelector;
use crate::vcs::{GitVcs, VersionControl};
use crate::workflow::{run_code_edit_workflow, WorkflowDeps, WorkflowRequest};

use format::{format_banner, format_record, format_verdict, BannerInfo};

/// Options for `mend run`.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    pub requirement: String,
    pub project: Option<String>,
    pub editor: Option<String>,
    pub no_cache: bool,
}

/// First retry delay for generative calls; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Builds the production collaborators for a repository.
fn build_deps(
    repo_root: &Path,
    config: &Config,
    provider: Provider,
    no_cache: bool,
) -> Result<WorkflowDeps> {
    let cache_dir = (config.cache.enabled && !no_cache).then(|| repo_root.join(&config.cache.dir));
    debug!("Generation cache: {:?}", cache_dir);

    let client = OpenAiCompatClient::new(config.llm.clone())?;
    let generator: Arc<dyn TextGenerator> = Arc::new(
        CachedGenerator::new(client, config.llm.model.clone(), cache_dir)
            .with_retry(config.llm.max_attempts, RETRY_BASE_DELAY),
    );
    let vcs: Arc<dyn VersionControl> = Arc::new(GitVcs::new(repo_root));
    let runner: Arc<dyn CommandRunner> = Arc::new(ShellCommandRunner::new());

    Ok(WorkflowDeps {
        detector: Box::new(MarkerDetector::new(repo_root, config.projects.clone())),
        selector: Box::new(LlmFileSelector::new(Arc::clone(&generator), Arc::clone(&vcs))),
        analyzer: Box::new(LlmErrorAnalyzer::new(Arc::clone(&generator), repo_root)),
        extractor: Box::new(LlmFileNameExtractor::new(Arc::clone(&generator), repo_root)),
        installer: Box::new(CommandInstaller::new(Arc::clone(&runner))),
        editor: create_editor(provider, &config.editor),
        generator,
        runner,
        vcs,
        settings: config.workflow.clone(),
        repo_root: repo_root.to_path_buf(),
    })
}

/// Runs the workflow and prints its record.
///
/// A build that never passes is reported, not returned as an error.
pub(crate) async fn run(options: RunOptions) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = Config::load(&cwd).context("Failed to load mend.toml")?;

    let provider = resolve_provider(&config.editor, options.editor.as_deref())?;
    let deps = build_deps(&cwd, &config, provider, options.no_cache)?;

    let banner = BannerInfo::new(&options.requirement, &config, provider, options.no_cache);
    print!("{}", format_banner(&banner));

    let record = run_code_edit_workflow(
        &deps,
        WorkflowRequest {
            requirement: options.requirement,
            project: None,
            project_filter: options.project,
        },
    )
    .await?;

    print!("{}", format_record(&record));
    println!("{}", format_verdict(&record));
    Ok(())
}
