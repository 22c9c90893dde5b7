use parley_core::{ContextMode, MAX_CONTEXT_LENGTH};
use parley_providers::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Key written into a freshly created config file.
pub const PLACEHOLDER_API_KEY: &str = "your-gemini-api-key-here";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "GeminiConfig::default_model")]
    pub model: String,
    #[serde(default = "GeminiConfig::default_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: Self::default_model(),
            base_url: Self::default_base_url(),
        }
    }
}

impl GeminiConfig {
    fn default_model() -> String {
        DEFAULT_MODEL.to_string()
    }

    fn default_base_url() -> String {
        DEFAULT_BASE_URL.to_string()
    }

    /// The API key, rejecting an empty or placeholder value.
    pub fn api_key(&self) -> anyhow::Result<&str> {
        let key = self.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            anyhow::bail!(
                "No Gemini API key configured. Set {API_KEY_ENV} or run 'parley init' and edit ~/parley/config.json."
            );
        }
        Ok(key)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionSettings {
    /// Number of exchanges kept in the context window
    #[serde(default = "SessionSettings::default_max_context_length")]
    pub max_context_length: usize,
    /// Mode selected when a chat starts
    #[serde(default)]
    pub default_mode: ContextMode,
    /// Optional upper bound on a single generation call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_timeout_secs: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_context_length: Self::default_max_context_length(),
            default_mode: ContextMode::Default,
            dispatch_timeout_secs: None,
        }
    }
}

impl SessionSettings {
    const fn default_max_context_length() -> usize {
        MAX_CONTEXT_LENGTH
    }

    #[must_use]
    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Config {
    /// Load `~/parley/config.json`, falling back to defaults when it does not
    /// exist, then apply the `GEMINI_API_KEY` override.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let config = Self::load_from(&config_path)?;
            info!("Loaded config from {}", config_path.display());
            config
        } else {
            info!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Replace the configured key with `key` when it is present and non-blank.
    pub fn apply_api_key_override(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            info!("Using API key from {API_KEY_ENV}");
            self.providers.gemini.api_key = key;
        }
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("parley"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Contents of a freshly initialized config file.
    pub fn template() -> anyhow::Result<String> {
        let mut config = Self::default();
        config.providers.gemini.api_key = PLACEHOLDER_API_KEY.to_string();
        Ok(serde_json::to_string_pretty(&config)?)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, Self::template()?)?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("   1. Edit the config file and add your Gemini API key (or set {API_KEY_ENV})");
        println!("   2. Run 'parley chat' to start a conversation");
        println!();
        println!("Configuration options:");
        println!("   - model: Gemini model to use (gemini-1.5-flash, gemini-1.5-pro, etc.)");
        println!("   - max_context_length: Number of exchanges kept as conversation context");
        println!("   - default_mode: Default Context, Professional, Casual or Creative");
        println!("   - dispatch_timeout_secs: Give up on a reply after this many seconds");
        println!();
        Ok(())
    }
}
