//! Configuration loading for the vitrine client.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vitrine_core::{RouteTable, Slug};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "VITRINE_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub default_slug: String,
    /// Path segments that introduce a tenant slug, e.g. `["t"]`.
    pub tenant_prefixes: Vec<String>,
    /// Routes (after the tenant prefix) resolved through membership.
    pub institutional_routes: Vec<String>,
    pub request_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    pub event_capacity: usize,
    pub cache: CacheSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Lmdb,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub store: StoreKind,
    /// Required for `store = "lmdb"`.
    pub path: Option<PathBuf>,
    pub max_size_mb: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or VITRINE_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Load from `explicit`, else from `VITRINE_CONFIG`, then validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(config_path_from_env)
            .ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must be an http(s) URL".to_string(),
            });
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_key",
                reason: "must not be empty".to_string(),
            });
        }
        if let Err(e) = Slug::parse(&self.default_slug) {
            return Err(ConfigError::InvalidValue {
                field: "default_slug",
                reason: e.to_string(),
            });
        }
        for prefix in &self.tenant_prefixes {
            let trimmed = prefix.trim_matches('/');
            if trimmed.is_empty() || trimmed.contains('/') {
                return Err(ConfigError::InvalidValue {
                    field: "tenant_prefixes",
                    reason: format!("{:?} must be a single path segment", prefix),
                });
            }
        }
        for route in &self.institutional_routes {
            if route.trim_matches('/').is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "institutional_routes",
                    reason: "routes must not be empty or '/'".to_string(),
                });
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "event_capacity",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_secs",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.store == StoreKind::Lmdb {
            match &self.cache.path {
                Some(path) if !path.as_os_str().is_empty() => {}
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "cache.path",
                        reason: "required when cache.store = \"lmdb\"".to_string(),
                    })
                }
            }
            if self.cache.max_size_mb == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "cache.max_size_mb",
                    reason: "must be > 0".to_string(),
                });
            }
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The validated default slug.
    pub fn default_slug(&self) -> Result<Slug, ConfigError> {
        Slug::parse(&self.default_slug).map_err(|e| ConfigError::InvalidValue {
            field: "default_slug",
            reason: e.to_string(),
        })
    }

    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        let table = self
            .tenant_prefixes
            .iter()
            .fold(RouteTable::new(self.default_slug()?), |t, p| t.with_tenant_prefix(p));
        Ok(self
            .institutional_routes
            .iter()
            .fold(table, |t, r| t.with_institutional_route(r)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
api_base_url = "https://api.example.com"
api_key = "anon-key"
default_slug = "main"
tenant_prefixes = ["t"]
institutional_routes = ["/portal"]
request_timeout_ms = 5000
fetch_timeout_ms = 8000
event_capacity = 64

[cache]
ttl_secs = 3600
store = "memory"
max_size_mb = 16

[log]
format = "pretty"
filter = "vitrine=info"
"#;

    fn sample() -> ClientConfig {
        ClientConfig::from_toml(SAMPLE).unwrap()
    }

    #[test]
    fn test_sample_parses_and_validates() {
        let config = sample();
        config.validate().unwrap();
        assert_eq!(config.cache.store, StoreKind::Memory);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(8));
    }

    #[test]
    fn test_route_table_from_config() {
        let table = sample().route_table().unwrap();
        assert_eq!(table.resolve_slug("/t/acme/portal").as_str(), "acme");
        assert!(table.is_institutional("/t/acme/portal/agenda"));
        assert_eq!(table.resolve_slug("/about").as_str(), "main");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let top_level = SAMPLE.replace("[cache]", "surprise = true\n\n[cache]");
        assert!(matches!(
            ClientConfig::from_toml(&top_level),
            Err(ConfigError::Parse(_))
        ));

        let nested = SAMPLE.replace("[log]", "[log]\nsurprise = true");
        assert!(matches!(
            ClientConfig::from_toml(&nested),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = sample();
        config.default_slug = "Not A Slug!".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "default_slug", .. })
        ));

        let mut config = sample();
        config.fetch_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "fetch_timeout_ms", .. })
        ));

        let mut config = sample();
        config.cache.store = StoreKind::Lmdb;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "cache.path", .. })
        ));

        let mut config = sample();
        config.tenant_prefixes = vec!["a/b".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "tenant_prefixes", .. })
        ));

        let mut config = sample();
        config.api_base_url = "ftp://example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "api_base_url", .. })
        ));
    }
}
