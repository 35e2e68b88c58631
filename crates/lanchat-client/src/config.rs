//! Client configuration loaded from environment variables.
//!
//! All settings have defaults that work against a relay on the same machine.

use std::path::PathBuf;

use lanchat_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_WS_PATH, DEFAULT_WS_PORT, UPDATE_NAME_PATH,
};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Relay host name or IP.
    /// Env: `LANCHAT_HOST`
    /// Default: `localhost`
    pub server_host: String,

    /// Relay WebSocket port.
    /// Env: `LANCHAT_WS_PORT`
    /// Default: `4001`
    pub ws_port: u16,

    /// WebSocket path on the relay.
    /// Env: `LANCHAT_WS_PATH`
    /// Default: `/ws`
    pub ws_path: String,

    /// Relay HTTP port (serves `/update-name`).
    /// Env: `LANCHAT_HTTP_PORT`
    /// Default: `4000`
    pub http_port: u16,

    /// Directory for `lanchat.db`.
    /// Env: `LANCHAT_DATA_DIR`
    /// Default: platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Display name to start with, overriding the persisted one.
    /// Env: `LANCHAT_NAME`
    pub display_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: "localhost".to_string(),
            ws_port: DEFAULT_WS_PORT,
            ws_path: DEFAULT_WS_PATH.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            data_dir: None,
            display_name: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("LANCHAT_HOST").filter(|h| !h.trim().is_empty()) {
            config.server_host = host.trim().to_string();
        }

        if let Some(port) = lookup("LANCHAT_WS_PORT") {
            config.ws_port = parse_port("LANCHAT_WS_PORT", &port, config.ws_port);
        }

        if let Some(path) = lookup("LANCHAT_WS_PATH") {
            config.ws_path = if path.starts_with('/') {
                path
            } else {
                format!("/{path}")
            };
        }

        if let Some(port) = lookup("LANCHAT_HTTP_PORT") {
            config.http_port = parse_port("LANCHAT_HTTP_PORT", &port, config.http_port);
        }

        if let Some(dir) = lookup("LANCHAT_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }

        config.display_name = lookup("LANCHAT_NAME")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        config
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}{}", self.server_host, self.ws_port, self.ws_path)
    }

    pub fn update_name_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.server_host, self.http_port, UPDATE_NAME_PATH
        )
    }
}

fn parse_port(var: &str, value: &str, default: u16) -> u16 {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => port,
        _ => {
            tracing::warn!(var, value = %value, "Invalid port, using default");
            default
        }
    }
}
