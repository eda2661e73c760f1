//! Turning raw diagnostic text into remediation hints.
//!
//! Two collaborators live here:
//! - `ErrorAnalyzer`: diagnostic text + candidate files -> `Diagnosis`
//!   (extra files to include, packages to install)
//! - `FileNameExtractor`: diagnostic text -> files worth editing
//!
//! Both ask the generative service first and fall back to scanning the text
//! for paths. Only paths that exist in the repository survive.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::llm::{generate_json, string_array, TextGenerator};

/// Diagnostic text beyond this many trailing bytes is not sent to the service.
const MAX_DIAGNOSTIC_BYTES: usize = 12_000;

/// Structured remediation hint derived from failure output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Diagnosis {
    /// Files to add to the next edit, relative to the repository root.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Packages to install before the next edit.
    #[serde(default)]
    pub packages: Vec<String>,
}

impl Diagnosis {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.packages.is_empty()
    }
}

#[async_trait]
pub(crate) trait ErrorAnalyzer: Send + Sync {
    async fn analyze(&self, diagnostic: &str, candidates: &[PathBuf]) -> Diagnosis;
}

#[async_trait]
pub(crate) trait FileNameExtractor: Send + Sync {
    async fn extract(&self, diagnostic: &str, known: &[PathBuf]) -> Vec<PathBuf>;
}

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[A-Za-z0-9_.\-]+/)*[A-Za-z0-9_\-][A-Za-z0-9_.\-]*\.(?:rs|ts|tsx|js|jsx|mjs|cjs|py|go|java|kt|cs|cpp|cc|c|h|hpp|rb|php|swift|vue|svelte|json|toml|ya?ml)\b",
    )
    .expect("PATH_RE regex should compile")
});

/// Path-like tokens in `text`, first occurrence order, without duplicates.
pub(crate) fn scan_paths(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in PATH_RE.find_iter(text) {
        let name = m.as_str().trim_start_matches("./").to_string();
        if !found.contains(&name) {
            found.push(name);
        }
    }
    found
}

/// Maps names from diagnostic output onto existing repository files.
///
/// A name resolves if it exists relative to `repo_root`, or if it is a
/// suffix of a `known` path (output of a command run in a sub-project).
pub(crate) fn resolve_paths<I>(names: I, repo_root: &Path, known: &[PathBuf]) -> Vec<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    let root_prefix = format!("{}/", repo_root.display());
    let mut resolved: Vec<PathBuf> = Vec::new();

    for name in names {
        let name = name.strip_prefix(&root_prefix).unwrap_or(&name);
        let name = name.trim_start_matches("./");
        let candidate = PathBuf::from(name);
        if candidate.as_os_str().is_empty() || candidate.is_absolute() {
            continue;
        }

        let hit = if repo_root.join(&candidate).is_file() {
            Some(candidate)
        } else {
            known.iter().find(|k| k.ends_with(&candidate)).cloned()
        };

        if let Some(path) = hit {
            if !resolved.contains(&path) {
                resolved.push(path);
            }
        }
    }
    resolved
}

/// Keeps the tail of long output, where compilers put the summary.
fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Analyzer backed by the generative service.
pub(crate) struct LlmErrorAnalyzer {
    generator: Arc<dyn TextGenerator>,
    repo_root: PathBuf,
}

impl LlmErrorAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            repo_root: repo_root.into(),
        }
    }

    fn prompt(diagnostic: &str, candidates: &[PathBuf]) -> String {
        let mut prompt = String::from(
            "A build or test command failed while implementing a change.\n\n\
             Diagnostic output:\n```\n",
        );
        prompt.push_str(tail(diagnostic, MAX_DIAGNOSTIC_BYTES));
        prompt.push_str("\n```\n\nFiles currently being edited:\n");
        for file in candidates {
            let _ = writeln!(prompt, "- {}", file.display());
        }
        prompt.push_str(
            "\nWhich additional existing files must be edited to fix this failure, and which \
             packages must be installed? Answer as {\"files\": [paths], \"packages\": [names]}. \
             Use empty lists when nothing is needed.",
        );
        prompt
    }
}

#[async_trait]
impl ErrorAnalyzer for LlmErrorAnalyzer {
    async fn analyze(&self, diagnostic: &str, candidates: &[PathBuf]) -> Diagnosis {
        let (llm_files, packages) = match generate_json(
            self.generator.as_ref(),
            "analyze_errors",
            &Self::prompt(diagnostic, candidates),
        )
        .await
        {
            Ok(value) => (string_array(&value, "files"), string_array(&value, "packages")),
            Err(e) => {
                warn!("Error analysis unavailable, scanning output instead: {e:#}");
                (Vec::new(), Vec::new())
            }
        };

        let names = llm_files.into_iter().chain(scan_paths(diagnostic));
        let files: Vec<PathBuf> = resolve_paths(names, &self.repo_root, candidates)
            .into_iter()
            .filter(|f| !candidates.contains(f))
            .collect();

        let diagnosis = Diagnosis { files, packages };
        debug!(?diagnosis, "Analyzed diagnostic output");
        diagnosis
    }
}

/// Filename extraction backed by the generative service.
pub(crate) struct LlmFileNameExtractor {
    generator: Arc<dyn TextGenerator>,
    repo_root: PathBuf,
}

impl LlmFileNameExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            repo_root: repo_root.into(),
        }
    }
}

#[async_trait]
impl FileNameExtractor for LlmFileNameExtractor {
    async fn extract(&self, diagnostic: &str, known: &[PathBuf]) -> Vec<PathBuf> {
        let prompt = format!(
            "List the source files that this static analysis output reports problems in.\n\n\
             ```\n{}\n```\n\nAnswer as {{\"files\": [paths]}}.",
            tail(diagnostic, MAX_DIAGNOSTIC_BYTES)
        );

        let names = match generate_json(self.generator.as_ref(), "extract_file_names", &prompt)
            .await
        {
            Ok(value) => string_array(&value, "files"),
            Err(e) => {
                warn!("File name extraction unavailable, scanning output instead: {e:#}");
                scan_paths(diagnostic)
            }
        };

        resolve_paths(names, &self.repo_root, known)
    }
}
