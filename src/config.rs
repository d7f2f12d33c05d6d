//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf, time::Duration};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "posts.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
    /// Browser frontend allowed to make credentialed cross-origin calls
    pub frontend_url: Option<String>,
    /// Upper bound on handling a whole request, in seconds
    pub request_timeout_secs: u64,
    /// Upper bound on reading a request body for CSRF extraction, in seconds
    pub read_timeout_secs: u64,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://posts.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Session cookie configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session cookie max age in seconds (default: 3600 = 1 hour)
    pub session_max_age: i64,
    /// Path shared by the session and CSRF cookies
    pub cookie_path: String,
    /// Optional cookie domain
    pub cookie_domain: Option<String>,
}

/// Uploaded image storage
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded images are written to and served from
    pub media_dir: PathBuf,
    /// Maximum accepted upload size in bytes (default: 8 MiB)
    pub max_upload_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        format!("postboard={},tower_http=debug", self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (POSTBOARD__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.read_timeout_secs", 10)?
            .set_default("database.path", "data/postboard.db")?
            .set_default("auth.session_max_age", 3600)?
            .set_default("auth.cookie_path", "/")?
            .set_default("storage.media_dir", "files/static/images")?
            .set_default("storage.max_upload_bytes", 8 * 1024 * 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("POSTBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if !self.auth.cookie_path.starts_with('/') {
            return Err(crate::error::AppError::Config(
                "auth.cookie_path must start with '/'".to_string(),
            ));
        }

        if self.server.request_timeout_secs == 0 || self.server.read_timeout_secs == 0 {
            return Err(crate::error::AppError::Config(
                "server timeouts must be greater than 0".to_string(),
            ));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(crate::error::AppError::Config(
                "storage.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if self.should_use_secure_cookies() && !self.server.protocol.eq_ignore_ascii_case("https")
        {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
