// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Default request body cap for uploads (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Browser origins allowed when `CORS_ORIGINS` is unset (the admin UI's dev server).
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it results live in memory only.
    pub database_url: Option<String>,
    /// Base URL of the remote exam backend, if one is deployed.
    pub backend_url: Option<Url>,
    pub backend_timeout: Duration,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Origins the CORS layer lets through.
    pub cors_origins: Vec<String>,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            backend_url: None,
            backend_timeout: Duration::from_secs(10),
            port: 3000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());

        let backend_url = env::var("BACKEND_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .and_then(|raw| match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    eprintln!("Ignoring invalid BACKEND_URL '{}': {}", raw, e);
                    None
                }
            });

        let backend_timeout = env::var("BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.backend_timeout);

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_upload_bytes);

        let cors_origins = env::var("CORS_ORIGINS")
            .ok()
            .map(|raw| parse_origins(&raw))
            .unwrap_or(defaults.cors_origins);

        let rust_log = env::var("RUST_LOG").unwrap_or(defaults.rust_log);

        Self {
            database_url,
            backend_url,
            backend_timeout,
            port,
            max_upload_bytes,
            cors_origins,
            rust_log,
        }
    }
}

/// Splits a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
