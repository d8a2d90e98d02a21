use crate::error::{AipmError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// PathsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_prds_dir")]
    pub prds_dir: String,
    #[serde(default = "default_epics_dir")]
    pub epics_dir: String,
}

fn default_prds_dir() -> String {
    paths::DEFAULT_PRDS_DIR.to_string()
}

fn default_epics_dir() -> String {
    paths::DEFAULT_EPICS_DIR.to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prds_dir: default_prds_dir(),
            epics_dir: default_epics_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// AiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Override for the generateContent endpoint (proxies, tests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_model() -> String {
    genai_client::DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            base_url: None,
        }
    }
}

impl AiConfig {
    /// API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    pub fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        non_empty(lookup(&self.api_key_env)).ok_or_else(|| {
            AipmError::MissingConfig(format!(
                "{} is not set (required for --ai)",
                self.api_key_env
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// TrackerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_repo_env")]
    pub repo_env: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_repo_env() -> String {
    "GITHUB_REPO".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            repo_env: default_repo_env(),
            api_url: default_api_url(),
        }
    }
}

/// Everything needed to talk to the issue tracker for one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerCredentials {
    pub api_url: String,
    pub token: String,
    pub owner: String,
    pub repo: String,
}

impl TrackerConfig {
    pub fn credentials(&self) -> Result<TrackerCredentials> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    pub fn credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<TrackerCredentials> {
        let token = non_empty(lookup(&self.token_env)).ok_or_else(|| {
            AipmError::MissingConfig(format!("{} is not set", self.token_env))
        })?;
        let full = non_empty(lookup(&self.repo_env)).ok_or_else(|| {
            AipmError::MissingConfig(format!("{} is not set (expected owner/name)", self.repo_env))
        })?;
        let (owner, repo) = full
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
            .ok_or_else(|| {
                AipmError::MissingConfig(format!(
                    "{} must be owner/name, got '{full}'",
                    self.repo_env
                ))
            })?;
        Ok(TrackerCredentials {
            api_url: self.api_url.trim_end_matches('/').to_string(),
            token,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            paths: PathsConfig::default(),
            ai: AiConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl Config {
    /// Load `.aipm/config.yaml`; a missing file means all defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = crate::io::read_text(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn layout(&self, root: &Path) -> paths::Layout {
        paths::Layout::new(root, &self.paths)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message })
        };

        if self.paths.prds_dir.trim().is_empty() {
            push(WarnLevel::Error, "paths.prds_dir is empty".to_string());
        }
        if self.paths.epics_dir.trim().is_empty() {
            push(WarnLevel::Error, "paths.epics_dir is empty".to_string());
        }
        if self.paths.prds_dir == self.paths.epics_dir {
            push(
                WarnLevel::Warning,
                format!(
                    "paths.prds_dir and paths.epics_dir are both '{}'",
                    self.paths.prds_dir
                ),
            );
        }

        if self.ai.max_retries == 0 {
            push(
                WarnLevel::Warning,
                "ai.max_retries=0: --ai will always fall back to defaults".to_string(),
            );
        } else if self.ai.max_retries > 10 {
            push(
                WarnLevel::Warning,
                format!("ai.max_retries={} (>10 is unusual)", self.ai.max_retries),
            );
        }
        if self.ai.model.trim().is_empty() {
            push(WarnLevel::Error, "ai.model is empty".to_string());
        }

        if !self.tracker.api_url.starts_with("http://")
            && !self.tracker.api_url.starts_with("https://")
        {
            push(
                WarnLevel::Error,
                format!(
                    "tracker.api_url '{}' is not an http(s) URL",
                    self.tracker.api_url
                ),
            );
        }

        warnings
    }

    // -----------------------------------------------------------------------
    // Environment report
    // -----------------------------------------------------------------------

    /// The environment variables this configuration reads, secrets masked.
    pub fn env_report(&self) -> Vec<EnvVar> {
        self.env_report_with(|name| std::env::var(name).ok())
    }

    pub fn env_report_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<EnvVar> {
        let entry = |name: &str, purpose: &str, secret: bool| {
            let value = non_empty(lookup(name)).map(|v| if secret { mask_secret(&v) } else { v });
            EnvVar {
                name: name.to_string(),
                purpose: purpose.to_string(),
                value,
            }
        };
        vec![
            entry(&self.tracker.token_env, "issue tracker token", true),
            entry(&self.tracker.repo_env, "issue tracker repository", false),
            entry(&self.ai.api_key_env, "generative-text API key", true),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub purpose: String,
    pub value: Option<String>,
}

/// Keep the first four characters, hide the rest.
pub fn mask_secret(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{prefix}****")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
