use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{debug, info};
use toml::Value;

use crate::faults::{BackoffConfig, RetryPolicy};
use crate::navigation::DEFAULT_EVENT_CAPACITY;

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "APPSHELL_CONFIG";

/// Title used for user messages when none is configured
pub const DEFAULT_MESSAGE_TITLE: &str = "Application Shell";

/// Configuration manager
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a ConfigManager from an in-memory Configuration
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using the discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self::default())
    }

    /// Load configuration from an explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Get value with section fallback: selected section, then `section`, then `[base]`
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(Some(true)),
                "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    pub fn get_u64(&self, section: &str, key: &str) -> Result<Option<u64>> {
        self.get_value(section, key)
            .map(|value| {
                value
                    .parse::<u64>()
                    .with_context(|| format!("Invalid number for {}.{}: {}", section, key, value))
            })
            .transpose()
    }

    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Retry policy from the `[faults]` section
    ///
    /// Without `max-attempts` the policy is unbounded. Backoff is only
    /// enabled when `initial-delay-ms` is set.
    pub fn get_retry_policy(&self) -> Result<RetryPolicy> {
        let mut policy = RetryPolicy::unbounded();

        if let Some(max_attempts) = self.get_u64("faults", "max-attempts")? {
            let max_attempts = u32::try_from(max_attempts)
                .with_context(|| format!("max-attempts out of range: {}", max_attempts))?;
            policy.max_attempts = Some(max_attempts);
        }

        if let Some(initial_delay_ms) = self.get_u64("faults", "initial-delay-ms")? {
            let defaults = BackoffConfig::default();
            let mut backoff = BackoffConfig {
                initial_delay_ms,
                max_delay_ms: defaults.max_delay_ms.max(initial_delay_ms),
                multiplier: defaults.multiplier,
            };
            if let Some(max_delay_ms) = self.get_u64("faults", "max-delay-ms")? {
                backoff.max_delay_ms = max_delay_ms;
            }
            if let Some(multiplier) = self.get_value("faults", "backoff-multiplier") {
                backoff.multiplier = multiplier
                    .parse::<f64>()
                    .with_context(|| format!("Invalid backoff-multiplier in config: {}", multiplier))?;
            }
            policy.backoff = Some(backoff);
        }

        policy
            .validate()
            .map_err(|e| anyhow::anyhow!("Retry policy validation failed: {}", e))?;
        Ok(policy)
    }

    /// Window title for user messages
    pub fn get_message_title(&self) -> String {
        self.get_value("faults", "message-title")
            .cloned()
            .unwrap_or_else(|| DEFAULT_MESSAGE_TITLE.to_string())
    }

    /// Capacity of the navigation event channel
    pub fn get_event_capacity(&self) -> Result<usize> {
        match self.get_u64("navigation", "event-capacity")? {
            Some(0) => Err(anyhow::anyhow!("navigation.event-capacity must be greater than 0")),
            Some(capacity) => Ok(capacity as usize),
            None => Ok(DEFAULT_EVENT_CAPACITY),
        }
    }
}

/// Configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(env_path));
    }

    paths.push(PathBuf::from("./appshell.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("appshell").join("config.toml"));
    }

    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".appshell.toml"));
    }

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content into section -> key -> value
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse().context("Failed to parse TOML content")?;

    let mut config = Configuration::new();
    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    Ok(config)
}

/// Flatten nested tables into dotted section names; top-level keys land in `[base]`
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        match value {
            Value::Table(subtable) => {
                let section_name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_toml_table(subtable, section_name, config);
            }
            _ => {
                let section = if prefix.is_empty() { "base".to_string() } else { prefix.clone() };
                config
                    .entry(section)
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(value));
            }
        }
    }
}

fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}
