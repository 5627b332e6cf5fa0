//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml, --config)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub sync: SyncConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Remote exercise catalog API
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// API root, e.g. "https://www.exercisedb.dev/api/v1"
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Pagination and pacing of the sync loop
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Records requested per page (default: 25)
    pub page_size: u32,
    /// Fixed pause between requests in milliseconds (default: 5000)
    pub rate_limit_delay_ms: u64,
    /// Consecutive failed fetches tolerated before giving up (default: 3)
    pub max_consecutive_failures: u32,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the database file
    pub dir: PathBuf,
    /// Database name; the file is `<dir>/<name>.db`
    pub name: String,
}

impl DatabaseConfig {
    /// Path to the SQLite database file
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(format!("{}.db", self.name))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

/// Metrics export configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsConfig {
    /// Write the registry here in Prometheus text format when the run ends
    pub textfile_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. `extra_file` (must exist when given)
    /// 5. Environment variables (EXERCISE_SYNC__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load(extra_file: Option<&Path>) -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            .set_default("catalog.base_url", "https://www.exercisedb.dev/api/v1")?
            .set_default("catalog.timeout_seconds", 30)?
            .set_default(
                "catalog.user_agent",
                concat!("exercise-sync/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("sync.page_size", 25)?
            .set_default("sync.rate_limit_delay_ms", 5000)?
            .set_default("sync.max_consecutive_failures", 3)?
            .set_default("database.dir", "data")?
            .set_default("database.name", "fitness_db")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("EXERCISE_SYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), AppError> {
        url::Url::parse(&self.catalog.base_url).map_err(|e| {
            AppError::Config(format!(
                "catalog.base_url is not a valid URL ({}): {}",
                self.catalog.base_url, e
            ))
        })?;

        if self.catalog.timeout_seconds == 0 {
            return Err(AppError::Config(
                "catalog.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.sync.page_size == 0 {
            return Err(AppError::Config(
                "sync.page_size must be greater than 0".to_string(),
            ));
        }

        if self.sync.max_consecutive_failures == 0 {
            return Err(AppError::Config(
                "sync.max_consecutive_failures must be greater than 0".to_string(),
            ));
        }

        if self.database.name.trim().is_empty() {
            return Err(AppError::Config(
                "database.name must not be empty".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            catalog: CatalogConfig {
                base_url: "https://catalog.example.com/api/v1".to_string(),
                timeout_seconds: 30,
                user_agent: "exercise-sync-test".to_string(),
            },
            sync: SyncConfig {
                page_size: 25,
                rate_limit_delay_ms: 5000,
                max_consecutive_failures: 3,
            },
            database: DatabaseConfig {
                dir: PathBuf::from("/tmp/exercise-sync-test"),
                name: "fitness_db".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            metrics: MetricsConfig::default(),
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn database_file_is_named_after_database() {
        let config = valid_config();
        assert_eq!(
            config.database.file_path(),
            PathBuf::from("/tmp/exercise-sync-test/fitness_db.db")
        );
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = valid_config();
        config.sync.page_size = 0;

        let error = config
            .validate()
            .expect_err("a zero page size would never advance the cursor");
        assert!(matches!(
            error,
            AppError::Config(message) if message.contains("sync.page_size")
        ));
    }

    #[test]
    fn validate_rejects_zero_failure_cap() {
        let mut config = valid_config();
        config.sync.max_consecutive_failures = 0;

        let error = config.validate().expect_err("failure cap must be positive");
        assert!(matches!(
            error,
            AppError::Config(message) if message.contains("max_consecutive_failures")
        ));
    }

    #[test]
    fn validate_rejects_unparsable_base_url() {
        let mut config = valid_config();
        config.catalog.base_url = "not a url".to_string();

        let error = config.validate().expect_err("base url must parse");
        assert!(matches!(
            error,
            AppError::Config(message) if message.contains("catalog.base_url")
        ));
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = valid_config();
        config.logging.format = "xml".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(
            &path,
            "[sync]\npage_size = 10\nrate_limit_delay_ms = 0\n\n[database]\nname = \"from_file\"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.sync.page_size, 10);
        assert_eq!(config.sync.rate_limit_delay_ms, 0);
        assert_eq!(config.sync.max_consecutive_failures, 3);
        assert_eq!(config.database.name, "from_file");
    }

    #[test]
    fn load_fails_for_missing_explicit_file() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/exercise-sync.toml")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
