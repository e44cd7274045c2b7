use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host[:port]` of the jukebox server, without scheme.
    #[serde(default = "default_host")]
    pub host: String,
    /// Use `wss://`/`https://` instead of `ws://`/`http://`.
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Period of the status/queue refresh while connected.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Upper bound for any single request-endpoint call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Queries with fewer (trimmed) characters cannot be submitted.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            secure: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
        }
    }
}

fn default_host() -> String {
    platform::DEFAULT_HOST.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_min_query_len() -> usize {
    1
}

impl ServerConfig {
    /// Live channel endpoint, e.g. `ws://127.0.0.1:8081/ws`.
    pub fn ws_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}/ws", scheme, self.host)
    }

    /// Base for the request endpoints, e.g. `http://127.0.0.1:8081`.
    pub fn http_base(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.host)
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)?
        };

        if let Some(host) = platform::host_override() {
            tracing::debug!("{} overrides server host: {}", platform::HOST_ENV, host);
            config.server.host = host;
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1:8081");
        assert!(!config.server.secure);
        assert_eq!(config.sync.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.http.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.search.min_query_len, 1);
        assert!(Config::config_path().ends_with("juke/config.toml"));
    }

    #[test]
    fn test_urls() {
        let mut server = ServerConfig {
            host: "juke.example:8443".to_string(),
            secure: false,
        };
        assert_eq!(server.ws_url(), "ws://juke.example:8443/ws");
        assert_eq!(server.http_base(), "http://juke.example:8443");
        server.secure = true;
        assert_eq!(server.ws_url(), "wss://juke.example:8443/ws");
        assert_eq!(server.http_base(), "https://juke.example:8443");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            host = "10.0.0.2:9000"

            [sync]
            poll_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "10.0.0.2:9000");
        assert_eq!(config.sync.poll_interval_ms, 250);
        assert_eq!(config.http.request_timeout_secs, 10);
        assert_eq!(config.search.min_query_len, 1);
    }
}
