//! Runtime settings: environment first, optional TOML override file.
//!
//! `GIGACHAT_API_KEY` is the only mandatory piece; everything else has a
//! default matching the hosted deployment. `TRAINER_CONFIG_PATH` may point
//! at a TOML file tweaking the client and retry knobs.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, error};

/// Errors that prevent the process from starting at all.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("GIGACHAT_API_KEY is not set or empty")]
  MissingCredential,
}

/// Fully resolved settings for one backend process.
#[derive(Clone, Debug)]
pub struct Settings {
  /// Bearer credential for the chat completion service.
  pub credential: String,
  pub gigachat: GigachatSettings,
  pub retry: RetrySettings,
  /// SQLite file holding per-learner training state.
  pub database_path: String,
}

/// Connection settings for the chat completion endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GigachatSettings {
  pub base_url: String,
  pub model: String,
  pub timeout_secs: u64,
  /// The endpoint's certificate chain is signed by a CA most trust stores
  /// do not carry, so verification stays off for this client only.
  pub insecure_tls: bool,
}

impl Default for GigachatSettings {
  fn default() -> Self {
    Self {
      base_url: "https://gigachat.devices.sberbank.ru/api/v1".into(),
      model: "GigaChat-Max".into(),
      timeout_secs: 300,
      insecure_tls: true,
    }
  }
}

impl GigachatSettings {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

/// Attempt budgets and waits for the generation retry loop.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
  /// Attempts for day material, the call learners block on.
  pub material_attempts: u32,
  /// Attempts for quiz, grading and summary calls.
  pub default_attempts: u32,
  /// Fallback wait after a rate limit with no usable Retry-After.
  pub rate_limit_wait_secs: u64,
  /// Wait after any other failed attempt.
  pub transient_wait_secs: u64,
}

impl Default for RetrySettings {
  fn default() -> Self {
    Self {
      material_attempts: 30,
      default_attempts: 10,
      rate_limit_wait_secs: 60,
      transient_wait_secs: 10,
    }
  }
}

impl RetrySettings {
  pub fn rate_limit_wait(&self) -> Duration {
    Duration::from_secs(self.rate_limit_wait_secs)
  }

  pub fn transient_wait(&self) -> Duration {
    Duration::from_secs(self.transient_wait_secs)
  }
}

/// Shape of the optional override file. Missing sections keep defaults.
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
  #[serde(default)]
  gigachat: GigachatSettings,
  #[serde(default)]
  retry: RetrySettings,
}

impl Settings {
  /// Resolve settings from the environment. A missing credential is fatal;
  /// everything else falls back to defaults.
  pub fn from_env() -> Result<Self, ConfigError> {
    let credential = std::env::var("GIGACHAT_API_KEY")
      .ok()
      .filter(|v| !v.trim().is_empty())
      .ok_or(ConfigError::MissingCredential)?;

    let overrides = load_overrides_from_env().unwrap_or_default();
    let mut gigachat = overrides.gigachat;
    if let Ok(v) = std::env::var("GIGACHAT_BASE_URL") {
      gigachat.base_url = v;
    }
    if let Ok(v) = std::env::var("GIGACHAT_MODEL") {
      gigachat.model = v;
    }

    let database_path =
      std::env::var("DATABASE_PATH").unwrap_or_else(|_| "./kurso.db".into());

    Ok(Self {
      credential,
      gigachat,
      retry: overrides.retry,
      database_path,
    })
  }
}

/// Attempt to load overrides from TRAINER_CONFIG_PATH. On any parsing/IO
/// error, returns None and keeps defaults.
fn load_overrides_from_env() -> Option<FileOverrides> {
  let path = std::env::var("TRAINER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<FileOverrides>(&s) {
      Ok(cfg) => {
        info!(target: "kurso_backend", %path, "Loaded settings override (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "kurso_backend", %path, error = %e, "Failed to parse TOML override");
        None
      }
    },
    Err(e) => {
      error!(target: "kurso_backend", %path, error = %e, "Failed to read TOML override file");
      None
    }
  }
}
