//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Once;

use postboard::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

static METRICS: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// Session and CSRF cookie values issued by a login
#[derive(Debug, Clone)]
pub struct LoginCookies {
    pub session_token: String,
    pub csrf_token: String,
}

impl LoginCookies {
    /// Value for a `Cookie` request header carrying both tokens
    pub fn header(&self) -> String {
        format!(
            "session_token={}; csrf_token={}",
            self.session_token, self.csrf_token
        )
    }
}

/// Build a test configuration rooted in `dir`
pub fn test_config(dir: &std::path::Path) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
            frontend_url: Some("http://localhost:3000".to_string()),
            request_timeout_secs: 30,
            read_timeout_secs: 5,
        },
        database: config::DatabaseConfig {
            path: dir.join("test.db"),
        },
        auth: config::AuthConfig {
            session_max_age: 3600,
            cookie_path: "/".to_string(),
            cookie_domain: None,
        },
        storage: config::StorageConfig {
            media_dir: dir.join("images"),
            max_upload_bytes: 64 * 1024,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with adjusted configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        METRICS.call_once(postboard::metrics::init_metrics);

        // Create temporary directory for test database and uploads
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path());
        adjust(&mut config);

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = postboard::build_router(state.clone());

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

    /// Open a second connection to the server's database
    pub async fn raw_pool(&self) -> sqlx::SqlitePool {
        let options = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(&self.state.config.database.path);
        sqlx::SqlitePool::connect_with(options).await.unwrap()
    }

    /// Register a user through the API
    pub async fn register(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/register"))
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .unwrap()
    }

    /// Log in through the API
    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/login"))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .unwrap()
    }

    /// Register then log in, returning the issued cookies
    pub async fn register_and_login(&self, username: &str) -> LoginCookies {
        let password = "correct-horse";
        let email = format!("{username}@example.com");

        let response = self.register(username, &email, password).await;
        assert_eq!(response.status(), 201);

        let response = self.login(username, password).await;
        assert_eq!(response.status(), 200);
        login_cookies(&response)
    }
}

/// All `Set-Cookie` header values of a response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The `Set-Cookie` header value for the named cookie
pub fn find_set_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(response)
        .into_iter()
        .find(|cookie| cookie.starts_with(&prefix))
}

/// Value of the named cookie as set by the response
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let cookie = find_set_cookie(response, name)?;
    let pair = cookie.split(';').next()?;
    pair.split_once('=').map(|(_, value)| value.to_string())
}

/// Cookies issued by a successful login
pub fn login_cookies(response: &reqwest::Response) -> LoginCookies {
    LoginCookies {
        session_token: cookie_value(response, "session_token").expect("session_token cookie"),
        csrf_token: cookie_value(response, "csrf_token").expect("csrf_token cookie"),
    }
}
