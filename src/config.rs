use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::snippet::SnippetLanguage;
use crate::templates::schema::Environment;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub snippet: SnippetConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to write logs to `<state>/logs` instead of stderr
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the JSON template store
    #[serde(default = "default_store_path")]
    pub store: String,
    /// Local state (logs)
    #[serde(default = "default_state_path")]
    pub state: String,
}

fn default_store_path() -> String {
    ".notiflow/store".to_string()
}

fn default_state_path() -> String {
    ".notiflow".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            store: default_store_path(),
            state: default_state_path(),
        }
    }
}

/// How trigger snippets are rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetConfig {
    /// SDK package imported by the Node.js snippet
    #[serde(default = "default_package")]
    pub package: String,
    /// SDK client class
    #[serde(default = "default_client")]
    pub client: String,
    #[serde(default = "default_api_key_placeholder")]
    pub api_key_placeholder: String,
    /// Value shown for every payload variable
    #[serde(default = "default_data_placeholder")]
    pub data_placeholder: String,
    /// Base URL used by the cURL snippet
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub language: SnippetLanguage,
}

fn default_package() -> String {
    "@novu/node".to_string()
}

fn default_client() -> String {
    "Novu".to_string()
}

fn default_api_key_placeholder() -> String {
    "<API_KEY>".to_string()
}

fn default_data_placeholder() -> String {
    "<REPLACE_WITH_DATA>".to_string()
}

fn default_api_url() -> String {
    "https://api.novu.co".to_string()
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            package: default_package(),
            client: default_client(),
            api_key_placeholder: default_api_key_placeholder(),
            data_placeholder: default_data_placeholder(),
            api_url: default_api_url(),
            language: SnippetLanguage::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Environment the CLI works in unless overridden
    #[serde(default)]
    pub environment: Environment,
    /// Ask before destructive actions such as deleting a step
    #[serde(default = "default_true")]
    pub confirm_destructive: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            confirm_destructive: true,
        }
    }
}

impl Config {
    /// Path to the project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".notiflow/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the editor works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/notiflow/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("notiflow").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables, e.g. NOTIFLOW__EDITOR__ENVIRONMENT=production
        builder = builder.add_source(
            config::Environment::with_prefix("NOTIFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to `.notiflow/config.toml`
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::project_config_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to the template store
    pub fn store_path(&self) -> PathBuf {
        absolute(&self.paths.store)
    }

    /// Get absolute path to the state directory
    pub fn state_path(&self) -> PathBuf {
        absolute(&self.paths.state)
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

fn absolute(path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}
