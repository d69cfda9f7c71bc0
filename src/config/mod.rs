//! Configuration loading and management
//!
//! Configuration comes from a YAML file (path in `HOMESTEAD_CONFIG`,
//! optional) with environment-variable overrides for the values that
//! differ per deployment. Every field has a sensible default so the
//! service boots in development with nothing but `DATABASE_URL` set.

use serde::{Deserialize, Serialize};

use crate::core::error::HomesteadResult;

/// Deployment environment; controls diagnostic detail in error
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/homestead".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "homestead-photos".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub google_api_key: String,
    pub nominatim_user_agent: String,
    /// Per-provider call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            google_api_key: String::new(),
            nominatim_user_agent: "homestead/0.3 (ops@homestead.example)".to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Proximity filter radius in kilometers. A fixed constant rather
    /// than a request parameter, which bounds query cost.
    pub radius_km: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { radius_km: 50.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Upper bound on simultaneous in-flight photo uploads.
    pub max_concurrent_uploads: usize,
    /// Additional attempts per photo after the first.
    pub retry_attempts: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: 4,
            retry_attempts: 2,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub geocoding: GeocodingConfig,
    pub search: SearchConfig,
    pub media: MediaConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            geocoding: GeocodingConfig::default(),
            search: SearchConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> HomesteadResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> HomesteadResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load the deployment configuration: the file named by
    /// `HOMESTEAD_CONFIG` (when set), then environment overrides.
    pub fn load() -> HomesteadResult<Self> {
        let mut config = match std::env::var("HOMESTEAD_CONFIG") {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(bucket) = std::env::var("S3_BUCKET_NAME") {
            self.storage.bucket = bucket;
        }
        if let Ok(region) = std::env::var("AWS_REGION") {
            self.storage.region = region;
        }
        if let Ok(key) = std::env::var("GOOGLE_MAPS_API_KEY") {
            self.geocoding.google_api_key = key;
        }
        if let Ok(env) = std::env::var("APP_ENV") {
            if env.eq_ignore_ascii_case("production") {
                self.environment = Environment::Production;
            }
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Proximity search radius converted to meters.
    pub fn radius_meters(&self) -> f64 {
        self.search.radius_km * 1_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_development() {
        let config = AppConfig::default();
        assert!(!config.is_production());
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.radius_meters(), 50_000.0);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = AppConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = AppConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.search.radius_km, config.search.radius_km);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let parsed = AppConfig::from_yaml_str(
            "environment: production\nsearch:\n  radius_km: 25\n",
        )
        .unwrap();
        assert!(parsed.is_production());
        assert_eq!(parsed.radius_meters(), 25_000.0);
        assert_eq!(parsed.media.max_concurrent_uploads, 4);
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        assert!(AppConfig::from_yaml_str("server: [not, a, map]").is_err());
    }
}
