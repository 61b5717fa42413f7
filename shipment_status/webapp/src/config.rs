use std::{
    fs,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use shared_logging::LogLevel;

/// Runtime settings, read from TOML and overridable from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Model artifact location.
    pub model: ModelSettings,
    /// Log verbosity and the optional JSON-lines prediction log.
    pub logging: LoggingSettings,
}

/// `[server]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Address the form is served on.
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8501)),
        }
    }
}

/// `[model]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    /// Path to the trained model artifact.
    pub path: PathBuf,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/shipment_status.json"),
        }
    }
}

/// `[logging]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Minimum level for console and file logs.
    pub level: LogLevel,
    /// JSON-lines file receiving one record per prediction.
    pub path: Option<PathBuf>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replaces `server.bind`.
    pub bind: Option<SocketAddr>,
    /// Replaces `model.path`.
    pub model: Option<PathBuf>,
    /// Replaces `logging.path`.
    pub log_file: Option<PathBuf>,
    /// Replaces `logging.level`.
    pub log_level: Option<LogLevel>,
}

impl AppConfig {
    /// Loads a TOML file. Relative paths inside it resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.model.path = resolve(&base, &config.model.path);
        config.logging.path = config.logging.path.map(|log| resolve(&base, &log));
        Ok(config)
    }

    /// Applies command-line overrides in place.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(model) = overrides.model {
            self.model.path = model;
        }
        if let Some(log_file) = overrides.log_file {
            self.logging.path = Some(log_file);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }
}

fn resolve(base: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}
