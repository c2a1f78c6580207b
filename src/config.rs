use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    /// Warehouse DSN. The `WAREHOUSE_URL` environment variable takes
    /// precedence so credentials can stay out of the config file.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model backing the assistant. `OPENAI_MODEL` overrides.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            poll_interval_secs: default_poll_interval_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_poll_interval_secs() -> u64 {
    2
}
fn default_run_timeout_secs() -> u64 {
    300
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivityConfig {
    /// Trailing window for the active-user query, in days.
    #[serde(default = "default_window_days")]
    pub window_days: i32,
    /// Minimum reading sessions inside the window to count as active.
    #[serde(default = "default_min_events")]
    pub min_events: i64,
    /// Maximum distinct books per user fed into the prompts.
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            min_events: default_min_events(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_window_days() -> i32 {
    14
}
fn default_min_events() -> i64 {
    5
}
fn default_history_limit() -> i64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Base URL prepended to recommended book ids in console output.
    #[serde(default = "default_library_url_base")]
    pub library_url_base: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            library_url_base: default_library_url_base(),
        }
    }
}

fn default_library_url_base() -> String {
    "https://library.example.com/book".to_string()
}

impl AssistantConfig {
    /// Model identifier, honoring the `OPENAI_MODEL` override.
    pub fn resolved_model(&self) -> String {
        std::env::var("OPENAI_MODEL").unwrap_or_else(|_| self.model.clone())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.assistant.poll_interval_secs == 0 {
        anyhow::bail!("assistant.poll_interval_secs must be > 0");
    }

    if config.assistant.run_timeout_secs == 0 {
        anyhow::bail!("assistant.run_timeout_secs must be > 0");
    }

    if config.activity.window_days < 1 {
        anyhow::bail!("activity.window_days must be >= 1");
    }

    if config.activity.history_limit < 1 {
        anyhow::bail!("activity.history_limit must be >= 1");
    }

    Ok(config)
}

impl Config {
    /// A configuration with every default, for commands that can run
    /// without a config file on disk.
    pub fn minimal() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.assistant.poll_interval_secs, 2);
        assert_eq!(config.assistant.run_timeout_secs, 300);
        assert_eq!(config.activity.window_days, 14);
        assert_eq!(config.activity.min_events, 5);
        assert_eq!(config.activity.history_limit, 5);
        assert_eq!(config.warehouse.max_connections, 5);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [activity]
            window_days = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.activity.window_days, 30);
        assert_eq!(config.activity.min_events, 5);
    }
}
