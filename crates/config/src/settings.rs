use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub redis: RedisSettings,
    pub cache: CacheSettings,
    pub activity: ActivitySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisSettings {
    pub url: String,
    /// When false the cache layer starts disconnected and every read
    /// goes straight to the loader.
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    pub summary_ttl_secs: u64,
}

/// Activity-log pipeline tuning. `enabled = false` turns the producer
/// into a warning no-op.
#[derive(Debug, Deserialize, Clone)]
pub struct ActivitySettings {
    pub enabled: bool,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
    pub dead_letter_window: usize,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("CREWDESK"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "crewdesk")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "crewdesk")?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.enabled", true)?
            .set_default("cache.summary_ttl_secs", 300)?
            .set_default("activity.enabled", true)?
            .set_default("activity.worker_count", 2)?
            .set_default("activity.queue_capacity", 1024)?
            .set_default("activity.max_attempts", 3)?
            .set_default("activity.retry_base_ms", 200)?
            .set_default("activity.dead_letter_window", 100)?
            .build()?;

        config.try_deserialize()
    }
}