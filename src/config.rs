//! Environment-driven runtime configuration.

use std::env;

use tracing::info;

const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_IDENTITY_URL: &str = "http://localhost:8081";
const DEFAULT_DISPATCH_URL: &str = "http://localhost:8082";
const DEFAULT_PORT: u16 = 8080;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// MongoDB connection URI.
    pub mongo_uri: String,
    /// Database name override, when set.
    pub mongo_db: Option<String>,
    /// Redis connection URL backing the live buffer.
    pub redis_url: String,
    /// Base URL of the team/identity service.
    pub identity_url: String,
    /// Base URL of the task dispatch transport.
    pub dispatch_url: String,
    /// TCP port the HTTP server binds.
    pub port: u16,
}

impl AppConfig {
    /// Load the configuration from the environment, falling back to local
    /// development defaults for anything unset.
    pub fn load() -> Self {
        Self {
            mongo_uri: env_or("MONGO_URI", DEFAULT_MONGO_URI),
            mongo_db: env::var("MONGO_DB").ok().filter(|value| !value.is_empty()),
            redis_url: env_or("REDIS_URL", DEFAULT_REDIS_URL),
            identity_url: env_or("IDENTITY_URL", DEFAULT_IDENTITY_URL),
            dispatch_url: env_or("DISPATCH_URL", DEFAULT_DISPATCH_URL),
            port: env::var("PORT")
                .or_else(|_| env::var("SERVER_PORT"))
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            info!(var, default, "environment variable unset; using default");
            default.to_owned()
        }
    }
}
