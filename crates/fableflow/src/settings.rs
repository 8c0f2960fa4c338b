//! Top-level settings for the FableFlow binary.
//!
//! Configuration sources in order of precedence (later overrides earlier):
//! 1. Bundled defaults (`fableflow.toml` shipped with the crate)
//! 2. User config in the home directory (`~/.config/fableflow/fableflow.toml`)
//! 3. User config in the current directory (`./fableflow.toml`)
//! 4. Environment variables (`FABLEFLOW__CHAT__MODEL=...`)
//!
//! The resulting [`Settings`] value is handed to the components that
//! consume it; nothing reads configuration from ambient global state.

use config::{Config, Environment, File, FileFormat};
use fableflow_book::{BookMeta, PdfStyle};
use fableflow_continuation::ContinuationConfig;
use fableflow_error::{ConfigError, FableFlowError, FableFlowResult};
use fableflow_pipeline::StagePrompts;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../fableflow.toml");

/// Connection settings for one OpenAI-compatible endpoint.
///
/// The API key is never stored in config files; `api_key_env` names the
/// environment variable holding it, resolved at client construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the `/v1` API root.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key_env: "MODEL_API_KEY".to_string(),
            model: "google/gemma-3-27b-it".to_string(),
            timeout_secs: 300,
        }
    }
}

impl ModelConfig {
    /// Resolves the API key from the configured environment variable.
    ///
    /// Absent or empty variables yield `None`; local inference servers
    /// accept unauthenticated requests.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Filesystem locations used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory receiving every pipeline artifact.
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output"),
        }
    }
}

/// Composed settings for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Chat-completions endpoint used by the editorial stages.
    pub chat: ModelConfig,
    /// Image-generation endpoint used by the illustrator.
    pub image: ModelConfig,
    /// Filesystem locations.
    pub paths: PathsConfig,
    /// Continuation loop tuning.
    pub continuation: ContinuationConfig,
    /// System prompts for the editorial stages.
    pub prompts: StagePrompts,
    /// Book metadata printed on the cover and publication pages.
    pub book: BookMeta,
    /// PDF page geometry and typography.
    pub style: PdfStyle,
}

impl Settings {
    /// Loads settings with precedence: env > current dir > home dir >
    /// bundled defaults.
    ///
    /// User config files are optional and silently skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source fails to read or parse.
    #[instrument]
    pub fn load() -> FableFlowResult<Self> {
        debug!("loading configuration with layered precedence");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/fableflow/fableflow.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("fableflow").required(false))
            .add_source(Environment::with_prefix("FABLEFLOW").separator("__"));

        Self::finish(builder)
    }

    /// Loads settings from one explicit file layered over the bundled
    /// defaults. Environment variables still take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> FableFlowResult<Self> {
        debug!("loading configuration from explicit file");

        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FABLEFLOW").separator("__"));

        Self::finish(builder)
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> FableFlowResult<Self> {
        builder
            .build()
            .map_err(|e| {
                FableFlowError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                FableFlowError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}
