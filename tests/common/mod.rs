//! Common test utilities for end-to-end sync tests

use std::path::PathBuf;
use std::time::Duration;

use exercise_sync::catalog::CatalogClient;
use exercise_sync::config;
use exercise_sync::data::Database;
use exercise_sync::service::SyncOptions;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PAGE_SIZE: u32 = 25;

const BODY_PARTS: [&str; 3] = ["waist", "chest", "back"];
const EQUIPMENT: [&str; 2] = ["body weight", "barbell"];

/// Mock catalog plus a throwaway database
pub struct TestEnv {
    pub server: MockServer,
    pub db: Database,
    pub catalog: CatalogClient,
    pub db_path: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        let server = MockServer::start().await;

        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("fitness_db.db");
        let db = Database::connect(&db_path).await.unwrap();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let catalog = CatalogClient::with_client(http, &server.uri()).unwrap();

        Self {
            server,
            db,
            catalog,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    /// Serve `data` for `offset`, expecting exactly `times` requests
    pub async fn mount_page(&self, offset: u64, data: Vec<Value>, times: u64) {
        Mock::given(method("GET"))
            .and(path("/exercises"))
            .and(query_param("offset", offset.to_string()))
            .and(query_param("limit", PAGE_SIZE.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Serve the declared total for `?limit=1`
    pub async fn mount_total(&self, total: u64) {
        Mock::given(method("GET"))
            .and(path("/exercises"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": exercises(0, 1),
                "total": total
            })))
            .mount(&self.server)
            .await;
    }

    /// Application config pointing at the mock catalog and the temp database
    pub fn app_config(&self) -> config::AppConfig {
        config::AppConfig {
            catalog: config::CatalogConfig {
                base_url: self.server.uri(),
                timeout_seconds: 5,
                user_agent: "exercise-sync-test".to_string(),
            },
            sync: config::SyncConfig {
                page_size: PAGE_SIZE,
                rate_limit_delay_ms: 0,
                max_consecutive_failures: 3,
            },
            database: config::DatabaseConfig {
                dir: self.db_path.parent().unwrap().to_path_buf(),
                name: "app_db".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            metrics: config::MetricsConfig::default(),
        }
    }
}

/// Sync options with no pacing delay
pub fn fast_options() -> SyncOptions {
    SyncOptions {
        page_size: PAGE_SIZE,
        rate_limit_delay: Duration::ZERO,
        max_consecutive_failures: 3,
    }
}

/// `len` catalog entries with ids starting at `start`
pub fn exercises(start: usize, len: usize) -> Vec<Value> {
    (start..start + len)
        .map(|i| {
            json!({
                "id": format!("{:04}", i),
                "name": format!("exercise {i}"),
                "bodyPart": BODY_PARTS[i % BODY_PARTS.len()],
                "equipment": EQUIPMENT[i % EQUIPMENT.len()],
                "target": "abs",
                "instructions": ["step one", "step two"],
                "secondaryMuscles": []
            })
        })
        .collect()
}
