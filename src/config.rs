use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Deadline for a full recipe generation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Deadline for a tag generation call.
    #[serde(default = "default_tag_timeout_secs")]
    pub tag_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            tag_timeout_secs: default_tag_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_tag_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// `basic`, `github`, or `disabled`.
    #[serde(default = "default_auth_mode")]
    pub mode: String,
    /// Basic mode: allowed usernames (passwords from `USER_<NAME>_PASSWORD`).
    /// GitHub mode: allowed GitHub logins.
    #[serde(default)]
    pub users: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            users: Vec::new(),
        }
    }
}

fn default_auth_mode() -> String {
    "basic".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    #[serde(default = "default_seed_path")]
    pub path: PathBuf,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            path: default_seed_path(),
        }
    }
}

fn default_seed_path() -> PathBuf {
    PathBuf::from("./recipes_with_tags.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
    #[serde(default = "default_snapshot_interval")]
    pub interval_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_snapshot_path(),
            interval_secs: default_snapshot_interval(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./data/recipes-snapshot.json")
}
fn default_snapshot_interval() -> u64 {
    5
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    match config.generation.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.generation.timeout_secs == 0 || config.generation.tag_timeout_secs == 0 {
        anyhow::bail!("generation timeouts must be > 0");
    }

    match config.auth.mode.as_str() {
        "disabled" => {}
        "basic" | "github" => {
            if config.auth.users.is_empty() {
                anyhow::bail!("auth.users must not be empty when auth.mode is '{}'", config.auth.mode);
            }
        }
        other => anyhow::bail!(
            "Unknown auth mode: '{}'. Must be basic, github, or disabled.",
            other
        ),
    }

    if config.snapshot.enabled && config.snapshot.interval_secs == 0 {
        anyhow::bail!("snapshot.interval_secs must be > 0");
    }

    Ok(config)
}
