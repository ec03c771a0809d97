use crewdesk_config::RedisSettings;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Bump when the shape of any cached value changes; stale entries under
/// the old prefix simply expire.
const KEY_VERSION: &str = "v1";

/// Best-effort read-through cache over Redis. Every failure mode
/// degrades to calling the loader directly; the cache is never a
/// correctness dependency.
#[derive(Clone)]
pub struct CacheService {
    conn: Option<ConnectionManager>,
}

impl CacheService {
    /// Connects to Redis; a connection failure yields a disconnected
    /// handle rather than an error.
    pub async fn connect(settings: &RedisSettings) -> Self {
        if !settings.enabled {
            return Self::disconnected();
        }

        let conn = match redis::Client::open(settings.url.as_str()) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => Some(conn),
                Err(e) => {
                    warn!(%e, "Redis unavailable, cache disabled");
                    None
                }
            },
            Err(e) => {
                warn!(%e, "Invalid Redis URL, cache disabled");
                None
            }
        };

        Self { conn }
    }

    pub fn disconnected() -> Self {
        Self { conn: None }
    }

    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    pub fn key(parts: &[&str]) -> String {
        let mut key = String::from(KEY_VERSION);
        for part in parts {
            key.push(':');
            key.push_str(part);
        }
        key
    }

    /// Cache-aside read. On a hit the stored JSON is deserialized; a
    /// payload that no longer parses is deleted and reloaded fresh. On a
    /// miss the loader runs and a non-null result is stored with `ttl`.
    pub async fn read_through<T, F, Fut, E>(
        &self,
        key: &str,
        ttl_secs: u64,
        loader: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let Some(conn) = &self.conn else {
            return loader().await;
        };
        let mut conn = conn.clone();

        match redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
        {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!(key, "Cache hit");
                    return Ok(Some(value));
                }
                Err(e) => {
                    // Corrupted entry: self-heal by dropping it.
                    warn!(key, %e, "Corrupted cache entry, deleting");
                    if let Err(e) = redis::cmd("DEL")
                        .arg(key)
                        .query_async::<()>(&mut conn)
                        .await
                    {
                        warn!(key, %e, "Failed to delete corrupted cache entry");
                    }
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(key, %e, "Cache read failed, falling back to loader");
                return loader().await;
            }
        }

        let value = loader().await?;

        if let Some(value_ref) = &value {
            match serde_json::to_string(value_ref) {
                Ok(raw) => {
                    if let Err(e) = redis::cmd("SET")
                        .arg(key)
                        .arg(raw)
                        .arg("EX")
                        .arg(ttl_secs)
                        .query_async::<()>(&mut conn)
                        .await
                    {
                        warn!(key, %e, "Cache store failed");
                    }
                }
                Err(e) => warn!(key, %e, "Cache serialization failed"),
            }
        }

        Ok(value)
    }

    /// Best-effort invalidation. Writers delete keys, never rewrite them.
    pub async fn invalidate(&self, key: &str) {
        let Some(conn) = &self.conn else {
            return;
        };
        let mut conn = conn.clone();
        if let Err(e) = redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
        {
            warn!(key, %e, "Cache invalidation failed");
        }
    }
}
