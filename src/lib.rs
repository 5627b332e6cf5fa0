//! exercise-sync - mirror a paginated exercise catalog into SQLite
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CLI / entry point                        │
//! │  - clap commands (sync, stats, show, search, filter, ...)   │
//! │  - Ctrl+C handling and cleanup                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Synchronizer: fetch → upsert → sleep, bounded retries    │
//! │  - Console report                                           │
//! └─────────────────────────────────────────────────────────────┘
//!               │                               │
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │   Catalog (reqwest)      │   │   Data Layer (sqlx/SQLite)   │
//! │  - GET /exercises pages  │   │  - upsert by id, aggregates  │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `catalog`: HTTP client for the exercise catalog API
//! - `service`: Sync loop and summary rendering
//! - `data`: Document store, models and indexes
//! - `cli`: Command-line arguments
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod catalog;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use cli::Command;
use error::AppError;

/// Everything a command needs, built once per process
///
/// The database handle and HTTP client are owned here and lent to the
/// synchronizer for the duration of a command.
pub struct SyncApp {
    pub config: config::AppConfig,
    pub db: data::Database,
    pub catalog: catalog::CatalogClient,
}

impl SyncApp {
    /// Connect to the database and build the catalog client
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrated, or the
    /// HTTP client cannot be built
    pub async fn new(config: config::AppConfig) -> Result<Self, AppError> {
        tracing::info!("Initializing exercise-sync...");

        let db_path = config.database.file_path();
        let db = data::Database::connect(&db_path).await?;
        tracing::info!(database = %config.database.name, "Connected to database");

        let catalog = catalog::CatalogClient::new(&config.catalog)?;

        Ok(Self {
            config,
            db,
            catalog,
        })
    }

    fn synchronizer(
        &self,
    ) -> service::Synchronizer<'_, catalog::CatalogClient, data::Database> {
        service::Synchronizer::new(
            &self.catalog,
            &self.db,
            service::SyncOptions::from(&self.config.sync),
        )
    }

    /// Run `command` and return the text to print
    pub async fn run_command(&self, command: &Command) -> Result<String, AppError> {
        match command {
            Command::Sync => {
                if let Err(error) = self.db.ensure_indexes().await {
                    tracing::error!(%error, "Error creating indexes");
                }

                let synchronizer = self.synchronizer();
                let stats = synchronizer.run_full_sync().await;
                let collection = synchronizer.collection_stats().await;
                Ok(service::render_summary(&stats, &collection))
            }
            Command::Stats => {
                // Counted directly: an empty store and a failed aggregate both
                // yield empty collection stats.
                if self.db.count_exercises().await? == 0 {
                    return Ok("No exercises stored.\n".to_string());
                }
                let collection = self.synchronizer().collection_stats().await;
                if collection.is_empty() {
                    return Err(AppError::Internal(anyhow::anyhow!(
                        "failed to aggregate collection statistics"
                    )));
                }
                Ok(service::render_collection_stats(&collection))
            }
            Command::Show { id } => {
                let record = self
                    .db
                    .get_exercise(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(id.clone()))?;
                let mut text = serde_json::to_string_pretty(&record.to_json())?;
                text.push('\n');
                Ok(text)
            }
            Command::Search { query, limit } => {
                let records = self.db.search_by_name(query, *limit).await?;
                Ok(render_listing(&records))
            }
            Command::Filter { criteria, limit } => {
                let filter = data::ExerciseFilter::from(criteria);
                if filter.is_unrestricted() {
                    tracing::info!("No filter criteria given, listing all exercises");
                }
                let records = self.db.query_exercises(&filter, *limit).await?;
                Ok(render_listing(&records))
            }
            Command::Filters => {
                let options = self.db.filter_options().await?;
                Ok(service::render_filter_options(&options))
            }
        }
    }

    /// Close the database and flush metrics
    pub async fn shutdown(&self) {
        if let Some(path) = &self.config.metrics.textfile_path {
            if let Err(error) = metrics::write_textfile(path) {
                tracing::error!(%error, "Failed to write metrics");
            }
        }
        self.db.close().await;
    }
}

fn render_listing(records: &[data::ExerciseRecord]) -> String {
    if records.is_empty() {
        return "No exercises matched.\n".to_string();
    }

    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "{}\t{}\n",
            record.id,
            record.name().unwrap_or("(unnamed)")
        ));
    }
    out
}
