//! Common test utilities for E2E tests

use std::sync::Once;

use gatehouse::auth::{Session, create_session_token};
use gatehouse::data::User;
use gatehouse::users::UserStore;
use gatehouse::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

// The metrics registry is process-wide; register collectors only once
// no matter how many servers a test binary spins up.
static METRICS_INIT: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        METRICS_INIT.call_once(gatehouse::metrics::init_metrics);

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "auth.test.example.com".to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig {
                url: format!("sqlite:{}", db_path.display()),
                debug: false,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                facebook: provider_credentials("facebook"),
                twitter: provider_credentials("twitter"),
                google: provider_credentials("google"),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config.clone()).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build the production router
        let app = gatehouse::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a local user directly in the store
    pub async fn create_local_user(&self, email: &str, password: &str) -> User {
        self.state
            .users
            .create_local_user(email, password, Some("Test User"))
            .await
            .unwrap()
    }

    /// Flip the disabled flag on a stored user
    pub async fn disable_user(&self, id: &str) {
        assert!(self.state.users.set_disabled(id, true).await.unwrap());
    }

    /// Mint a signed session token for the given user id
    pub fn session_token_for(&self, user_id: &str) -> String {
        let session = Session::new(
            user_id.to_string(),
            self.state.config.auth.session_max_age,
        );
        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }
}

fn provider_credentials(name: &str) -> config::OAuthProviderConfig {
    config::OAuthProviderConfig {
        client_id: format!("{name}-client-id"),
        client_secret: format!("{name}-client-secret"),
    }
}
