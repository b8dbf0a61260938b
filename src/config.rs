use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;
use std::{fs, io, path::Path};
use toml_edit::{DocumentMut, table, value};

pub const DEFAULT_CONFIG_PATH: &str = ".config/invoiceflow.toml";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub install: InstallConfig,
}

fn default_db_path() -> String {
    "invoiceflow/storage.db".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Mock,
    Heuristic,
}

#[derive(Debug, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

fn default_latency_ms() -> u64 {
    2000
}

impl ExtractionConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            latency_ms: default_latency_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_minutes_saved")]
    pub minutes_saved_per_invoice: u64,
}

fn default_minutes_saved() -> u64 {
    crate::stats::DEFAULT_MINUTES_SAVED
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            minutes_saved_per_invoice: default_minutes_saved(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_toast_ms")]
    pub toast_ms: u64,
}

fn default_recent_limit() -> usize {
    5
}

fn default_toast_ms() -> u64 {
    3000
}

impl DisplayConfig {
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            toast_ms: default_toast_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InstallConfig {
    #[serde(default = "default_prompt_delay_ms")]
    pub prompt_delay_ms: u64,
    #[serde(default)]
    pub installed: bool,
}

fn default_prompt_delay_ms() -> u64 {
    5000
}

impl InstallConfig {
    pub fn prompt_delay(&self) -> Duration {
        Duration::from_millis(self.prompt_delay_ms)
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            prompt_delay_ms: default_prompt_delay_ms(),
            installed: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            extraction: ExtractionConfig::default(),
            stats: StatsConfig::default(),
            display: DisplayConfig::default(),
            install: InstallConfig::default(),
        }
    }
}

impl Config {
    /// Load the config file; a missing file means all defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Set `install.installed = true` in place, keeping the rest of the file as written.
    pub fn mark_installed(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let mut doc = content.parse::<DocumentMut>()?;

        if !doc.contains_table("install") {
            doc["install"] = table();
        }
        doc["install"]["installed"] = value(true);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, doc.to_string())?;
        Ok(())
    }
}
