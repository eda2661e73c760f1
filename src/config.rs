use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::editor::Provider;

pub(crate) const CONFIG_FILE: &str = "mend.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Explicit project descriptors. When non-empty, marker detection is skipped.
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

/// Editor configuration - selects and configures the code editing CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EditorConfig {
    /// Which editor to use: "aider" or "claude"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Aider-specific configuration
    #[serde(default)]
    pub aider: AiderConfig,

    /// Claude-specific configuration
    #[serde(default)]
    pub claude: ClaudeConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            aider: AiderConfig::default(),
            claude: ClaudeConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Parse the provider string into a Provider enum
    pub fn get_provider(&self) -> Result<Provider> {
        self.provider.parse()
    }
}

fn default_provider() -> String {
    "aider".to_string()
}

/// Aider CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AiderConfig {
    /// Path to the aider executable
    #[serde(default = "default_aider_path")]
    pub path: String,

    /// Model to use (optional, uses aider's default if not set)
    #[serde(default)]
    pub model: Option<String>,

    /// Extra arguments appended to every invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for AiderConfig {
    fn default() -> Self {
        Self {
            path: default_aider_path(),
            model: None,
            extra_args: Vec::new(),
        }
    }
}

fn default_aider_path() -> String {
    "aider".to_string()
}

/// Claude Code CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ClaudeConfig {
    /// Path to the Claude CLI
    #[serde(default = "default_claude_path")]
    pub path: String,

    /// Model to use (optional)
    /// - Examples: "opus", "sonnet"
    #[serde(default)]
    pub model: Option<String>,

    /// Skip permission prompts (required for autonomous operation)
    #[serde(default = "default_true")]
    pub skip_permissions: bool,

    /// Output format
    #[serde(default = "default_claude_output_format")]
    pub output_format: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            path: default_claude_path(),
            model: None,
            skip_permissions: true,
            output_format: default_claude_output_format(),
        }
    }
}

fn default_claude_path() -> String {
    "claude".to_string()
}

fn default_claude_output_format() -> String {
    "text".to_string()
}

/// Generative text service configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LlmConfig {
    /// API base URL, without the trailing `/chat/completions`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Attempts per request before giving up, the first one included
    #[serde(default = "default_max_attempts", alias = "max_retries")]
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

/// Retry bounds for the three workflow stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WorkflowConfig {
    /// Edit-then-compile rounds before the workflow aborts
    #[serde(default = "default_attempts")]
    pub compile_attempts: u32,

    /// Static analysis rounds before failures are tolerated
    #[serde(default = "default_attempts")]
    pub static_analysis_attempts: u32,

    /// Test authoring rounds before failures are tolerated
    #[serde(default = "default_attempts")]
    pub test_attempts: u32,

    /// Prefix for commits created by the workflow itself
    #[serde(default = "default_commit_prefix")]
    pub commit_message_prefix: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            compile_attempts: default_attempts(),
            static_analysis_attempts: default_attempts(),
            test_attempts: default_attempts(),
            commit_message_prefix: default_commit_prefix(),
        }
    }
}

fn default_attempts() -> u32 {
    2
}

fn default_commit_prefix() -> String {
    "mend:".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheConfig {
    /// Memoize generative service responses on disk
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory, relative to the repository root
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".mend/cache")
}

/// One buildable project, declared explicitly instead of detected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProjectConfig {
    pub name: String,

    /// Project directory, relative to the repository root
    #[serde(default = "default_project_dir")]
    pub dir: PathBuf,

    pub compile: String,

    #[serde(default)]
    pub test: Option<String>,

    #[serde(default)]
    pub lint: Option<String>,

    /// Package install template; `{package}` is replaced by the package name
    #[serde(default)]
    pub install: Option<String>,
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

// Default value functions
fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file, using defaults if not found
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }
}
