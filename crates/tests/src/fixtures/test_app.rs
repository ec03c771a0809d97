use crewdesk_api::{build_router, state::AppState};
use crewdesk_config::Settings;
use crewdesk_db::indexes::ensure_indexes;
use mongodb::{Client, Database, options::ClientOptions};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// A running test application with its own MongoDB database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub db: Database,
    pub settings: Settings,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn a new test server connected to the test MongoDB.
    ///
    /// Requires a running MongoDB at localhost:27017.
    /// Set CREWDESK__DATABASE__URL env var to override the connection string.
    /// Each test gets a unique database name for isolation.
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawn a test server with customized settings.
    ///
    /// The `mutator` closure receives a `&mut Settings` after test defaults
    /// are applied, allowing tests to tweak specific fields.
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let db_name = format!("crewdesk_test_{}", uuid::Uuid::new_v4().simple());

        let mut settings = Settings::load().unwrap_or_else(|_| test_settings());
        // Allow env var override for database URL
        if let Ok(url) = std::env::var("CREWDESK__DATABASE__URL") {
            settings.database.url = url;
        }
        settings.database.name = db_name.clone();
        // Tests never talk to a real Redis; the cache degrades to the loader.
        settings.redis.enabled = false;
        // Keep the activity pipeline fast so tests can poll for its output.
        settings.activity.retry_base_ms = 10;

        // Apply caller's customizations
        mutator(&mut settings);

        let client_options = ClientOptions::parse(&settings.database.url)
            .await
            .expect("Failed to parse MongoDB URL");
        let mongo_client =
            Client::with_options(client_options).expect("Failed to create MongoDB client");
        let db = mongo_client.database(&db_name);

        ensure_indexes(&db).await.expect("Failed to create indexes");

        let app_state = AppState::new(db.clone(), settings.clone()).await;
        let app = build_router(app_state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            base_url,
            db,
            settings,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let db = self.db.clone();
        // Best effort cleanup: drop the test database
        tokio::spawn(async move {
            let _ = db.drop().await;
        });
    }
}

fn test_settings() -> Settings {
    Settings {
        app: crewdesk_config::AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
        },
        database: crewdesk_config::DatabaseSettings {
            url: "mongodb://localhost:27017".to_string(),
            name: "crewdesk_test".to_string(),
            max_pool_size: Some(5),
            min_pool_size: Some(1),
        },
        jwt: crewdesk_config::JwtSettings {
            secret: "test-secret-key-for-jwt-signing-minimum-32-chars".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 604800,
            issuer: "crewdesk".to_string(),
        },
        redis: crewdesk_config::RedisSettings {
            url: "redis://127.0.0.1:6379".to_string(),
            enabled: false,
        },
        cache: crewdesk_config::CacheSettings {
            summary_ttl_secs: 300,
        },
        activity: crewdesk_config::ActivitySettings {
            enabled: true,
            worker_count: 2,
            queue_capacity: 256,
            max_attempts: 3,
            retry_base_ms: 10,
            dead_letter_window: 100,
        },
    }
}
