//! Configuration management for Archivo Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::export::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub export: ExportConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the relay backend, e.g. "http://localhost:8085"
    pub endpoint: String,
    /// Bearer token presented on every relay call
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Maximum bytes per uploaded part
    pub chunk_size: usize,
    /// Directory that receives fallback copies when the relay path fails
    pub fallback_dir: PathBuf,
    /// Shared secret required to trigger an export
    pub admin_token: String,
    /// Wall-clock budget for one export run, in seconds
    pub deadline_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            relay: RelayConfig {
                endpoint: "http://localhost:8085".to_string(),
                token: String::new(),
            },
            export: ExportConfig {
                chunk_size: DEFAULT_CHUNK_SIZE,
                fallback_dir: PathBuf::from("./exports"),
                admin_token: String::new(),
                deadline_secs: 300,
            },
            database: DatabaseConfig {
                url: "sqlite:./archivo.db".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            relay: RelayConfig {
                endpoint: env::var("RELAY_ENDPOINT")?,
                token: env::var("RELAY_TOKEN").unwrap_or_default(),
            },
            export: ExportConfig {
                chunk_size: env::var("EXPORT_CHUNK_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_CHUNK_SIZE),
                fallback_dir: env::var("EXPORT_FALLBACK_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./exports")),
                admin_token: env::var("ADMIN_TOKEN")?,
                deadline_secs: env::var("EXPORT_DEADLINE_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./archivo.db".to_string()),
            },
        })
    }
}
