//! Runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Bounded retry policy for the cleanup absence wait.
///
/// The driver polls for pod absence at most `max_attempts` times with a
/// fixed `delay_ms` between polls. Exhausting the budget is a soft signal,
/// never an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy so tests can exhaust the budget without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay_ms: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Configuration for the game session backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Namespace all game resources live in.
    pub namespace: String,
    /// Container image for the game pod.
    pub image: String,
    /// Public domain serving the viewer URLs.
    pub domain: String,
    /// Host directory holding per-user save subdirectories.
    pub saves_host_path: String,
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
    /// Sessions idle longer than this are reaped.
    pub idle_timeout_minutes: i64,
    /// Retry policy for the cleanup absence wait.
    pub cleanup_retry: RetryPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            namespace: "cm-games".to_string(),
            image: "cm0102-server:latest".to_string(),
            domain: "game.localhost".to_string(),
            saves_host_path: "/data/cm-saves".to_string(),
            database_path: PathBuf::from("cm-app.db"),
            idle_timeout_minutes: 30,
            cleanup_retry: RetryPolicy::default(),
        }
    }
}

impl GameConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `CM_`-prefixed environment overrides (e.g. `CM_DOMAIN`, or
    /// `CM_CLEANUP_RETRY__MAX_ATTEMPTS` for nested fields).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = GameConfig::default();

        let mut builder = Config::builder()
            .set_default("namespace", defaults.namespace)?
            .set_default("image", defaults.image)?
            .set_default("domain", defaults.domain)?
            .set_default("saves_host_path", defaults.saves_host_path)?
            .set_default("database_path", defaults.database_path.display().to_string())?
            .set_default("idle_timeout_minutes", defaults.idle_timeout_minutes)?
            .set_default(
                "cleanup_retry.max_attempts",
                i64::from(defaults.cleanup_retry.max_attempts),
            )?
            .set_default("cleanup_retry.delay_ms", defaults.cleanup_retry.delay_ms as i64)?;

        if let Some(path) = path {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file: {}", path.display()))?;
            builder = builder.add_source(File::from_str(&contents, FileFormat::Toml));
        }

        builder
            .add_source(Environment::with_prefix("CM").separator("__").try_parsing(true))
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")
    }
}
