use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 5000;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// Server configuration.
///
/// Built from three layers, highest priority first:
///   1. CLI / env — passed as `Some(value)` from clap
///   2. TOML file at `{data_dir}/config.toml`
///   3. Built-in defaults
#[derive(Debug, Clone)]
pub struct TaskdConfig {
    pub port: u16,
    /// Bind address for the HTTP server (default: 127.0.0.1; use 0.0.0.0 for LAN access).
    pub bind_address: String,
    /// Directory holding the SQLite database and config.toml.
    pub data_dir: PathBuf,
    /// Log filter (trace, debug, info, warn, error).
    pub log: String,
    /// Log output format: "pretty" (default) | "json" (structured for log aggregators).
    pub log_format: String,
}

/// The subset of settings readable from `config.toml`. Every field is
/// optional so a partial file overrides only what it names.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    port: Option<u16>,
    bind_address: Option<String>,
    log: Option<String>,
    log_format: Option<String>,
}

impl TaskdConfig {
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
        log_format: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // TOML file is the lowest-priority override layer.
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());
        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);
        let log_format = log_format
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_format,
        }
    }
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/taskd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("taskd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/taskd or ~/.local/share/taskd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("taskd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("taskd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\taskd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("taskd");
        }
    }
    // Fallback
    PathBuf::from(".taskd")
}
