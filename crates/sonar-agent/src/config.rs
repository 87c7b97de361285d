//! # Environment-Based Configuration
//!
//! Everything the `sonar` binary needs is read from the environment, so a
//! deployment can change log location, collector credentials or model
//! without a rebuild.
//!
//! ## Environment Variables
//!
//! ### Telemetry
//! - `SONAR_LOG_PATH` - Local JSON Lines log (default: `agent_logs.json`)
//! - `ENVIRONMENT` - Deployment environment stamped on traces (default: `development`)
//! - `SONAR_REMOTE_TIMEOUT_MS` - Bound on each remote telemetry call, 1-30000 (default: 2000)
//! - `LANGFUSE_PUBLIC_KEY` / `LANGFUSE_SECRET_KEY` - Collector credentials; remote export is
//!   enabled only when both are set
//! - `LANGFUSE_HOST` - Collector base URL (default: `https://cloud.langfuse.com`)
//!
//! ### Agent
//! - `SONAR_AGENT_NAME` - Agent identifier (default: `research_agent`)
//! - `SONAR_MAX_ITERATIONS` - Planning steps per run, 1-64 (default: 8)
//!
//! ### Model
//! - `OPENAI_API_KEY` - Enables the OpenAI backend when set
//! - `OPENAI_BASE_URL` - Endpoint base URL (default: `https://api.openai.com/v1`)
//! - `SONAR_MODEL` - Model name (default: `gpt-4-turbo`)
//! - `SONAR_TEMPERATURE` - Sampling temperature, 0.0-2.0 (default: 0.1)

use crate::agent::{AgentProfile, DEFAULT_AGENT_NAME, DEFAULT_MAX_ITERATIONS};
use crate::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, OpenAiConfig};
use sonar_core::AgentId;
use sonar_observability::{DEFAULT_REMOTE_HOST, RemoteConfig, TelemetryConfig};
use std::{env, path::PathBuf, time::Duration};

const MAX_ITERATIONS_LIMIT: usize = 64;
const MAX_REMOTE_TIMEOUT_MS: u64 = 30_000;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Validated process configuration.
#[derive(Debug, Clone)]
pub struct SonarConfig {
    pub agent_name: AgentId,
    pub max_iterations: usize,
    pub telemetry: TelemetryConfig,
    /// `None` runs the offline keyword backend.
    pub openai: Option<OpenAiConfig>,
}

impl SonarConfig {
    pub fn profile(&self) -> AgentProfile {
        AgentProfile::new(self.agent_name.clone()).with_max_iterations(self.max_iterations)
    }
}

/// Builder for [`SonarConfig`] with environment variable support
#[derive(Debug, Clone)]
pub struct SonarConfigBuilder {
    agent_name: String,
    max_iterations: usize,
    log_path: PathBuf,
    environment: String,
    remote_timeout_ms: u64,
    langfuse_public_key: Option<String>,
    langfuse_secret_key: Option<String>,
    langfuse_host: String,
    openai_api_key: Option<String>,
    openai_base_url: String,
    model: String,
    temperature: f32,
}

impl Default for SonarConfigBuilder {
    fn default() -> Self {
        let telemetry = TelemetryConfig::default();
        Self {
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            log_path: telemetry.log_path,
            environment: telemetry.environment,
            remote_timeout_ms: telemetry.remote_timeout.as_millis() as u64,
            langfuse_public_key: None,
            langfuse_secret_key: None,
            langfuse_host: DEFAULT_REMOTE_HOST.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl SonarConfigBuilder {
    /// Create a new builder with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a numeric variable does not
    /// parse. Range checks happen in [`build`](Self::build).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        // Telemetry
        if let Some(path) = get_env_string("SONAR_LOG_PATH") {
            builder = builder.log_path(path);
        }
        if let Some(environment) = get_env_string("ENVIRONMENT") {
            builder = builder.environment(environment);
        }
        if let Some(timeout_ms) = get_env_u64("SONAR_REMOTE_TIMEOUT_MS")? {
            builder = builder.remote_timeout_ms(timeout_ms);
        }
        builder.langfuse_public_key = get_env_string("LANGFUSE_PUBLIC_KEY");
        builder.langfuse_secret_key = get_env_string("LANGFUSE_SECRET_KEY");
        if let Some(host) = get_env_string("LANGFUSE_HOST") {
            builder.langfuse_host = host;
        }

        // Agent
        if let Some(name) = get_env_string("SONAR_AGENT_NAME") {
            builder = builder.agent_name(name);
        }
        if let Some(max) = get_env_usize("SONAR_MAX_ITERATIONS")? {
            builder = builder.max_iterations(max);
        }

        // Model
        builder.openai_api_key = get_env_string("OPENAI_API_KEY");
        if let Some(base_url) = get_env_string("OPENAI_BASE_URL") {
            builder = builder.openai_base_url(base_url);
        }
        if let Some(model) = get_env_string("SONAR_MODEL") {
            builder = builder.model(model);
        }
        if let Some(temperature) = get_env_f32("SONAR_TEMPERATURE")? {
            builder = builder.temperature(temperature);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    #[must_use]
    pub fn remote_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.remote_timeout_ms = timeout_ms;
        self
    }

    /// Set collector credentials and host
    #[must_use]
    pub fn langfuse(
        mut self,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        self.langfuse_public_key = Some(public_key.into());
        self.langfuse_secret_key = Some(secret_key.into());
        self.langfuse_host = host.into();
        self
    }

    #[must_use]
    pub fn openai_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.openai_api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn openai_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.openai_base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Validate configuration and build [`SonarConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<SonarConfig, ConfigError> {
        self.validate()?;

        let agent_name = AgentId::parse(&self.agent_name)
            .map_err(|e| ConfigError::ValidationError(format!("agent_name: {e}")))?;

        let remote = match (self.langfuse_public_key, self.langfuse_secret_key) {
            (Some(public_key), Some(secret_key)) => Some(RemoteConfig::new(
                public_key,
                secret_key,
                self.langfuse_host,
            )),
            _ => None,
        };

        let openai = self.openai_api_key.map(|api_key| {
            OpenAiConfig::new(api_key)
                .with_base_url(self.openai_base_url)
                .with_model(self.model)
                .with_temperature(self.temperature)
        });

        Ok(SonarConfig {
            agent_name,
            max_iterations: self.max_iterations,
            telemetry: TelemetryConfig {
                log_path: self.log_path,
                environment: self.environment,
                remote,
                remote_timeout: Duration::from_millis(self.remote_timeout_ms),
                ..TelemetryConfig::default()
            },
            openai,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "max_iterations must be greater than 0".to_string(),
            ));
        }
        if self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_iterations must be <= {MAX_ITERATIONS_LIMIT}"
            )));
        }

        if self.remote_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "remote_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.remote_timeout_ms > MAX_REMOTE_TIMEOUT_MS {
            return Err(ConfigError::ValidationError(format!(
                "remote_timeout_ms must be <= {MAX_REMOTE_TIMEOUT_MS}"
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.log_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "log_path cannot be empty".to_string(),
            ));
        }
        if self.environment.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "environment cannot be empty".to_string(),
            ));
        }

        // Both keys or neither.
        if self.langfuse_public_key.is_some() != self.langfuse_secret_key.is_some() {
            return Err(ConfigError::ValidationError(
                "LANGFUSE_PUBLIC_KEY and LANGFUSE_SECRET_KEY must be set together".to_string(),
            ));
        }

        if let Some(key) = &self.openai_api_key
            && key.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "openai api key cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// Environment variable helper functions

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid usize value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_f32(key: &str) -> Result<Option<f32>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<f32>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid f32 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
