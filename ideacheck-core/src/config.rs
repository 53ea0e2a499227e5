//! Configuration system for IdeaCheck.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/ideacheck/config.toml` and/or
//! `.ideacheck/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::citations::CitationConfig;
use crate::error::ConfigError;
use crate::form::FormConfig;
use crate::gateway::GatewayConfig;

/// Top-level configuration for IdeaCheck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub flows: FlowsConfig,
    #[serde(default)]
    pub server: GatewayConfig,
    #[serde(default)]
    pub citations: CitationConfig,
}

impl AppConfig {
    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.form.min_idea_chars > self.form.max_idea_chars {
            return Err(ConfigError::Invalid {
                message: format!(
                    "form.min_idea_chars ({}) exceeds form.max_idea_chars ({})",
                    self.form.min_idea_chars, self.form.max_idea_chars
                ),
            });
        }
        if self.form.min_idea_chars == 0 {
            return Err(ConfigError::Invalid {
                message: "form.min_idea_chars must be at least 1".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "llm.temperature must be within 0.0..=2.0, got {}",
                    self.llm.temperature
                ),
            });
        }
        if self.flows.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                message: "flows.timeout_secs must be positive when set".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for the model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: "gemini" or "openai" (any OpenAI-compatible endpoint).
    pub provider: String,
    /// Model identifier (e.g., "gemini-2.0-flash", "gpt-4o-mini").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Default temperature for generation.
    pub temperature: f32,
    /// Authentication method: "api_key" (default) or "oauth".
    #[serde(default)]
    pub auth_method: String,
    /// Inline API key. Takes precedence over `api_key_env` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
            max_tokens: 4096,
            temperature: 0.7,
            auth_method: String::new(),
            api_key: None,
        }
    }
}

/// Settings applied by the calling layer around each flow invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowsConfig {
    /// Abandon a pending model call after this many seconds. Unset means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl FlowsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "ideacheck", "ideacheck")
}

/// Path of the user-level config file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".ideacheck").join("config.toml")
}

/// Load configuration with layered precedence.
///
/// Order (later wins): defaults, user config, workspace config,
/// `IDEACHECK_` environment variables, explicit overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&AppConfig>,
) -> Result<AppConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (IDEACHECK_LLM__MODEL, IDEACHECK_SERVER__PORT, etc.)
    figment = figment.merge(Env::prefixed("IDEACHECK_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether any IdeaCheck configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

/// Render a configuration as TOML, omitting the inline API key.
pub fn render_toml(config: &AppConfig) -> Result<String, ConfigError> {
    let mut redacted = config.clone();
    if redacted.llm.api_key.is_some() {
        redacted.llm.api_key = Some("<redacted>".to_string());
    }
    toml::to_string_pretty(&redacted).map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
