use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{DEFAULT_HOST, DEFAULT_PORT};

/// Server binding configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Resolved application configuration
///
/// Precedence: CLI/env arguments override the config file, which overrides
/// built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub demo_data: bool,
}

/// Optional on-disk configuration file (JSON)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FileConfig {
    server: FileServerConfig,
    demo_data: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FileServerConfig {
    host: Option<String>,
    port: Option<u16>,
}

impl AppConfig {
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => Self::read_file(path)?,
            None => FileConfig::default(),
        };

        let host = cli
            .host
            .clone()
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file.server.port).unwrap_or(DEFAULT_PORT);
        let demo_data = cli.demo_data || file.demo_data.unwrap_or(false);

        Ok(Self {
            server: ServerConfig { host, port },
            demo_data,
        })
    }

    fn read_file(path: &Path) -> Result<FileConfig> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
