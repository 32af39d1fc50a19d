//! Configuration module for the shell.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Default REST API origin (local development backend).
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin of the REST API, without trailing slash
    pub api_base_url: String,
    /// Base URL of the auth service
    pub auth_base_url: String,
    /// Address to bind the shell to
    pub bind_addr: SocketAddr,
    /// Path to the SQLite file backing local storage
    pub storage_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_base_url = normalize_base_url(
            &env::var("SALUT_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        )?;

        let auth_base_url = match env::var("SALUT_AUTH_BASE_URL") {
            Ok(raw) => normalize_base_url(&raw)?,
            Err(_) => format!("{}/api/auth", api_base_url),
        };

        let bind_addr = env::var("SALUT_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5173".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid SALUT_BIND_ADDR: {}", e)))?;

        let storage_path = env::var("SALUT_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/local-storage.sqlite".to_string())
            .into();

        let log_level = env::var("SALUT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_base_url,
            auth_base_url,
            bind_addr,
            storage_path,
            log_level,
        })
    }
}

/// Validate a base URL and strip its trailing slash.
fn normalize_base_url(raw: &str) -> Result<String, AppError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| AppError::Config(format!("Invalid base URL {:?}: {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "Base URL {:?} must use http or https",
            raw
        )));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        env::remove_var("SALUT_API_BASE_URL");
        env::remove_var("SALUT_AUTH_BASE_URL");
        env::remove_var("SALUT_BIND_ADDR");
        env::remove_var("SALUT_STORAGE_PATH");
        env::remove_var("SALUT_LOG_LEVEL");

        let config = Config::from_env().unwrap();

        assert_eq!(config.api_base_url, "http://localhost:3001");
        assert_eq!(config.auth_base_url, "http://localhost:3001/api/auth");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5173");
        assert_eq!(
            config.storage_path,
            PathBuf::from("./data/local-storage.sqlite")
        );
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://api.salut-annecy.fr/").unwrap(),
            "https://api.salut-annecy.fr"
        );
        assert_eq!(
            normalize_base_url("http://127.0.0.1:3001/api/auth").unwrap(),
            "http://127.0.0.1:3001/api/auth"
        );
        assert!(matches!(
            normalize_base_url("ftp://example.org"),
            Err(AppError::Config(_))
        ));
        assert!(normalize_base_url("not a url").is_err());
    }
}
