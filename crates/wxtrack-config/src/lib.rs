use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://weather.db";
pub const DEFAULT_PROVIDER_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    pub bind: Option<String>,
    /// `json` (default) or `pretty`
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub call_timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RefreshConfig {
    pub interval_secs: Option<u64>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: Option<ServerConfig>,
    pub database: Option<DatabaseConfig>,
    pub provider: Option<ProviderConfig>,
    pub refresh: Option<RefreshConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl AppConfig {
    /// Load configuration from the WXTRACK_CONFIG path (TOML) if present, with
    /// reasonable defaults. `DATABASE_URL` overrides `database.url`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WXTRACK_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_database_url(std::env::var("DATABASE_URL").ok()))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Replace the database URL when `url` is set and non-empty
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.database.get_or_insert_with(Default::default).url = Some(url);
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(refresh) = &self.refresh {
            if refresh.interval_secs == Some(0) {
                return Err(ConfigError::Invalid {
                    key: "refresh.interval_secs",
                    reason: "must be greater than zero".into(),
                });
            }
            if refresh.concurrency == Some(0) {
                return Err(ConfigError::Invalid {
                    key: "refresh.concurrency",
                    reason: "must be greater than zero".into(),
                });
            }
        }
        if let Some(provider) = &self.provider {
            if provider.call_timeout_secs == Some(0) {
                return Err(ConfigError::Invalid {
                    key: "provider.call_timeout_secs",
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    pub fn log_format(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.log_format.clone())
            .unwrap_or_else(|| "json".to_string())
    }

    pub fn database_url(&self) -> String {
        self.database
            .as_ref()
            .and_then(|d| d.url.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    fn provider(&self) -> ProviderConfig {
        self.provider.clone().unwrap_or_default()
    }

    pub fn provider_url(&self) -> String {
        self.provider()
            .base_url
            .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider().request_timeout_secs.unwrap_or(10))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.provider().call_timeout_secs.unwrap_or(30))
    }

    /// Zero disables the response cache
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.provider().cache_ttl_secs.unwrap_or(3600))
    }

    pub fn max_retries(&self) -> u32 {
        self.provider().max_retries.unwrap_or(5)
    }

    pub fn initial_backoff_ms(&self) -> u64 {
        self.provider().initial_backoff_ms.unwrap_or(200)
    }

    pub fn max_backoff_ms(&self) -> u64 {
        self.provider().max_backoff_ms.unwrap_or(5000)
    }

    pub fn refresh_interval(&self) -> Duration {
        let secs = self.refresh.as_ref().and_then(|r| r.interval_secs);
        Duration::from_secs(secs.unwrap_or(900))
    }

    pub fn refresh_concurrency(&self) -> usize {
        self.refresh
            .as_ref()
            .and_then(|r| r.concurrency)
            .unwrap_or(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.http_bind(), "0.0.0.0:8080");
        assert_eq!(cfg.database_url(), DEFAULT_DATABASE_URL);
        assert_eq!(cfg.provider_url(), DEFAULT_PROVIDER_URL);
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(900));
        assert_eq!(cfg.refresh_concurrency(), 4);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(cfg.max_retries(), 5);
        assert_eq!(cfg.initial_backoff_ms(), 200);
        assert_eq!(cfg.log_format(), "json");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.http_bind(), DEFAULT_BIND);
    }

    #[test]
    fn reads_sections_from_toml() {
        let file = write_config(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [database]
            url = "sqlite::memory:"

            [provider]
            cache_ttl_secs = 0
            max_retries = 2

            [refresh]
            interval_secs = 60
            concurrency = 1
            "#,
        );
        let cfg = AppConfig::load_from(file.path()).unwrap();

        assert_eq!(cfg.http_bind(), "127.0.0.1:9000");
        assert_eq!(cfg.database_url(), "sqlite::memory:");
        assert_eq!(cfg.cache_ttl(), Duration::ZERO);
        assert_eq!(cfg.max_retries(), 2);
        assert_eq!(cfg.call_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(60));
        assert_eq!(cfg.refresh_concurrency(), 1);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let file = write_config("[refresh]\ninterval_secs = 0\n");
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::Invalid {
                key: "refresh.interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let file = write_config("[server\nbind = 1");
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn database_url_override() {
        let cfg = AppConfig::default().with_database_url(Some("sqlite://other.db".into()));
        assert_eq!(cfg.database_url(), "sqlite://other.db");

        let cfg = AppConfig::default().with_database_url(Some(String::new()));
        assert_eq!(cfg.database_url(), DEFAULT_DATABASE_URL);
    }
}
