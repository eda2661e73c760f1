//! Project descriptors and marker-file detection.
//!
//! A repository may hold several buildable projects (a Cargo crate next to
//! a web frontend, say). Detection yields every candidate; the workflow
//! insists on exactly one.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ProjectConfig;

/// Immutable descriptor of one buildable project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ProjectInfo {
    /// Display name, unique among candidates.
    pub name: String,
    /// Directory every command runs in.
    pub base_dir: PathBuf,
    pub compile_command: String,
    pub test_command: Option<String>,
    pub lint_command: Option<String>,
    /// Install template with a `{package}` placeholder.
    pub install_command: Option<String>,
}

/// Source of project candidates.
pub(crate) trait ProjectDetector: Send + Sync {
    fn detect(&self) -> Result<Vec<ProjectInfo>>;
}

/// Directories never scanned for markers.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", "build", "vendor"];

/// Detects projects from configuration or from well-known build files.
#[derive(Debug, Clone)]
pub(crate) struct MarkerDetector {
    root: PathBuf,
    configured: Vec<ProjectConfig>,
}

impl MarkerDetector {
    pub fn new(root: impl Into<PathBuf>, configured: Vec<ProjectConfig>) -> Self {
        Self {
            root: root.into(),
            configured,
        }
    }

    fn from_config(&self, project: &ProjectConfig) -> ProjectInfo {
        ProjectInfo {
            name: project.name.clone(),
            base_dir: self.root.join(&project.dir),
            compile_command: project.compile.clone(),
            test_command: project.test.clone(),
            lint_command: project.lint.clone(),
            install_command: project.install.clone(),
        }
    }

    /// Scans one directory for build markers, in a fixed order.
    ///
    /// Several markers in one directory are told apart by a toolchain
    /// suffix, `web (rust)` next to `web (node)`.
    fn detect_in(&self, dir: &Path) -> Result<Vec<ProjectInfo>> {
        let name = self.project_name(dir);
        let mut found: Vec<(&str, ProjectInfo)> = Vec::new();

        if dir.join("Cargo.toml").is_file() {
            found.push((
                "rust",
                ProjectInfo {
                    name: name.clone(),
                    base_dir: dir.to_path_buf(),
                    compile_command: "cargo build --all-targets".to_string(),
                    test_command: Some("cargo test".to_string()),
                    lint_command: Some(
                        "cargo clippy --all-targets --fix --allow-dirty".to_string(),
                    ),
                    install_command: Some("cargo add {package}".to_string()),
                },
            ));
        }

        if dir.join("package.json").is_file() {
            found.push(("node", node_project(&name, dir)?));
        }

        if dir.join("go.mod").is_file() {
            found.push((
                "go",
                ProjectInfo {
                    name: name.clone(),
                    base_dir: dir.to_path_buf(),
                    compile_command: "go build ./...".to_string(),
                    test_command: Some("go test ./...".to_string()),
                    lint_command: Some("go vet ./...".to_string()),
                    install_command: Some("go get {package}".to_string()),
                },
            ));
        }

        if dir.join("pyproject.toml").is_file() {
            found.push((
                "python",
                ProjectInfo {
                    name: name.clone(),
                    base_dir: dir.to_path_buf(),
                    compile_command: "python -m compileall -q .".to_string(),
                    test_command: Some("python -m pytest".to_string()),
                    lint_command: None,
                    install_command: Some("pip install {package}".to_string()),
                },
            ));
        }

        let shared_dir = found.len() > 1;
        Ok(found
            .into_iter()
            .map(|(toolchain, mut project)| {
                if shared_dir {
                    project.name = format!("{name} ({toolchain})");
                }
                project
            })
            .collect())
    }

    fn project_name(&self, dir: &Path) -> String {
        match dir.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
            _ => self
                .root
                .file_name()
                .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().to_string()),
        }
    }
}

impl ProjectDetector for MarkerDetector {
    fn detect(&self) -> Result<Vec<ProjectInfo>> {
        if !self.configured.is_empty() {
            debug!("Using {} configured project(s)", self.configured.len());
            return Ok(self
                .configured
                .iter()
                .map(|p| self.from_config(p))
                .collect());
        }

        let mut candidates = self.detect_in(&self.root)?;

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read directory: {}", self.root.display()))?;
        let mut subdirs: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.') && !SKIPPED_DIRS.contains(&n))
            })
            .collect();
        subdirs.sort();

        for dir in subdirs {
            candidates.extend(self.detect_in(&dir)?);
        }

        debug!(
            "Detected projects: {:?}",
            candidates.iter().map(|p| &p.name).collect::<Vec<_>>()
        );
        Ok(candidates)
    }
}

/// npm's placeholder test script, which always fails.
const NPM_DEFAULT_TEST: &str = "echo \"Error: no test specified\" && exit 1";

fn node_project(name: &str, dir: &Path) -> Result<ProjectInfo> {
    let manifest = dir.join("package.json");
    let content = fs::read_to_string(&manifest)
        .with_context(|| format!("Failed to read {}", manifest.display()))?;
    let package: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", manifest.display()))?;

    let script = |key: &str| {
        package
            .get("scripts")
            .and_then(|s| s.get(key))
            .and_then(serde_json::Value::as_str)
    };

    let compile_command = if script("build").is_some() {
        "npm run build".to_string()
    } else if dir.join("tsconfig.json").is_file() {
        "npx tsc --noEmit".to_string()
    } else {
        "npm install".to_string()
    };

    let test_command = script("test")
        .filter(|s| *s != NPM_DEFAULT_TEST)
        .map(|_| "npm test".to_string());

    Ok(ProjectInfo {
        name: name.to_string(),
        base_dir: dir.to_path_buf(),
        compile_command,
        test_command,
        lint_command: script("lint").map(|_| "npm run lint".to_string()),
        install_command: Some("npm install {package}".to_string()),
    })
}

/// Keeps candidates matching `filter`.
///
/// An exact name match wins; otherwise every candidate whose directory
/// ends with `filter` is kept.
pub(crate) fn filter_candidates(
    candidates: Vec<ProjectInfo>,
    filter: Option<&str>,
) -> Vec<ProjectInfo> {
    let Some(wanted) = filter else {
        return candidates;
    };
    if candidates.iter().any(|p| p.name == wanted) {
        return candidates.into_iter().filter(|p| p.name == wanted).collect();
    }
    candidates
        .into_iter()
        .filter(|p| p.base_dir.ends_with(wanted))
        .collect()
}
