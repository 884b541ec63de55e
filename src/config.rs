use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,  // in bytes
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub sentinel_enabled: bool,
    pub sentinel_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub token_ttl_secs: u64,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8787,
            max_body_size: 1024 * 1024,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".into(),
            sentinel_enabled: false,
            sentinel_url: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 60 * 60 * 24 * 30,
            bcrypt_cost: 10,
        }
    }
}

impl Config {
    /// Defaults, then `config/default.*`, then `APP__SECTION__KEY` variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn redis_url(&self) -> Option<&str> {
        if self.redis.sentinel_enabled {
            self.redis.sentinel_url.as_deref()
        } else {
            Some(&self.redis.url)
        }
    }
}

/// Settings for the command-line client and its local cache.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub data_dir: Option<PathBuf>,
    pub max_pending_uploads: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8787".into(),
            data_dir: None,
            max_pending_uploads: 4,
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&ClientConfig::default())?)
            .add_source(config::File::with_name("config/client").required(false))
            .add_source(config::Environment::with_prefix("OVERTIME").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Cache directory, falling back to the platform data dir.
    pub fn resolve_data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("overtime"),
        }
    }
}
