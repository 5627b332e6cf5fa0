//! Catalog synchronizer
//!
//! Walks the catalog page by page and mirrors every record into the store.
//! Strictly sequential: fetch, upsert, sleep, repeat. A failed fetch is
//! retried at the same offset after the same fixed delay until the
//! consecutive-failure cap is reached.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{ExerciseSource, PageResponse};
use crate::config::SyncConfig;
use crate::data::{CollectionStats, ExerciseRecord, ExerciseStore, IndexedField};
use crate::error::FetchError;
use crate::metrics;

/// Number of groups kept per aggregate in [`CollectionStats`]
pub const TOP_GROUPS: u32 = 10;

/// Pacing and pagination knobs of the sync loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Records requested per page
    pub page_size: u32,
    /// Fixed pause after each full page and after each failed fetch
    pub rate_limit_delay: Duration,
    /// Consecutive failed fetches that end the run
    pub max_consecutive_failures: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 25,
            rate_limit_delay: Duration::from_secs(5),
            max_consecutive_failures: 3,
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            page_size: config.page_size,
            rate_limit_delay: Duration::from_millis(config.rate_limit_delay_ms),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

/// Outcome of one full sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Records received from the catalog
    pub total_fetched: u64,
    /// Records inserted or changed in the store
    pub total_saved: u64,
    /// Fresh store count at the end of the run; `None` if counting failed
    pub database_count: Option<u64>,
    /// Successful page fetches
    pub pages_fetched: u64,
    /// Failed fetch attempts, including retried ones
    pub failed_fetches: u64,
    /// The failure cap ended the run before end-of-data
    pub aborted: bool,
}

/// Drives a full catalog sync against one source and one store
///
/// Both collaborators are borrowed; the caller owns the HTTP client and the
/// database handle and closes them after the run.
pub struct Synchronizer<'a, S, D> {
    source: &'a S,
    store: &'a D,
    options: SyncOptions,
}

impl<'a, S, D> Synchronizer<'a, S, D>
where
    S: ExerciseSource,
    D: ExerciseStore,
{
    pub fn new(source: &'a S, store: &'a D, options: SyncOptions) -> Self {
        Self {
            source,
            store,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Fetch one page from the catalog
    pub async fn fetch_page(&self, offset: u64, limit: u32) -> Result<PageResponse, FetchError> {
        self.source.fetch_page(offset, limit).await
    }

    /// Declared catalog size, display only
    pub async fn total_count(&self) -> Option<u64> {
        self.source.total_count().await
    }

    /// Stamp and upsert one page of raw catalog entries
    ///
    /// Entries without a usable `id` are skipped. A storage error is logged
    /// and the page counts as nothing saved.
    ///
    /// # Returns
    /// Number of records inserted or changed
    pub async fn upsert_records(&self, entries: Vec<Value>) -> u64 {
        if entries.is_empty() {
            return 0;
        }

        let now = Utc::now();
        let records: Vec<ExerciseRecord> = entries
            .into_iter()
            .filter_map(|entry| match ExerciseRecord::from_api(entry, now) {
                Ok(record) => Some(record),
                Err(error) => {
                    tracing::warn!(%error, "Skipping catalog entry");
                    None
                }
            })
            .collect();

        match self.store.upsert_exercises(&records).await {
            Ok(saved) => {
                metrics::UPSERT_BATCHES_TOTAL
                    .with_label_values(&["success"])
                    .inc();
                metrics::RECORDS_SAVED_TOTAL.inc_by(saved);
                tracing::info!(saved, "Saved/updated exercises to database");
                saved
            }
            Err(error) => {
                metrics::UPSERT_BATCHES_TOTAL
                    .with_label_values(&["error"])
                    .inc();
                tracing::error!(records = records.len(), %error, "Error saving exercises to database");
                0
            }
        }
    }

    /// Fetch every page and mirror it into the store
    ///
    /// Never fails: fetch errors are retried up to the failure cap, write
    /// errors count as zero saved, and the returned stats describe whatever
    /// was completed.
    pub async fn run_full_sync(&self) -> SyncStats {
        let SyncOptions {
            page_size,
            rate_limit_delay,
            max_consecutive_failures,
        } = self.options;

        tracing::info!(page_size, "Starting to fetch all exercises");

        let declared_total = self.total_count().await;
        if declared_total.is_none() {
            tracing::warn!("Could not determine total exercise count, proceeding anyway");
        }

        let mut stats = SyncStats::default();
        let mut offset: u64 = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            let page = match self.fetch_page(offset, page_size).await {
                Ok(page) => page,
                Err(error) => {
                    stats.failed_fetches += 1;
                    consecutive_failures += 1;
                    if consecutive_failures >= max_consecutive_failures {
                        tracing::error!(
                            offset,
                            consecutive_failures,
                            %error,
                            "Too many consecutive failures, stopping"
                        );
                        stats.aborted = true;
                        break;
                    }
                    tracing::warn!(
                        offset,
                        attempt = consecutive_failures,
                        max = max_consecutive_failures,
                        "Retrying after failure"
                    );
                    tokio::time::sleep(rate_limit_delay).await;
                    continue;
                }
            };

            consecutive_failures = 0;
            stats.pages_fetched += 1;

            if page.is_empty() {
                tracing::info!(offset, "No more exercises to fetch");
                break;
            }

            let fetched = page.len() as u64;
            let short_page = page.len() < page_size as usize;

            let saved = self.upsert_records(page.data).await;
            stats.total_fetched += fetched;
            stats.total_saved += saved;
            metrics::RECORDS_FETCHED_TOTAL.inc_by(fetched);

            match declared_total {
                Some(total) => tracing::info!(
                    "Progress: {}/{} exercises fetched",
                    stats.total_fetched,
                    total
                ),
                None => tracing::info!("Progress: {} exercises fetched", stats.total_fetched),
            }

            if short_page {
                tracing::info!(offset, received = fetched, "Reached end of exercises");
                break;
            }

            offset += u64::from(page_size);

            tracing::debug!(
                delay_ms = rate_limit_delay.as_millis() as u64,
                "Waiting before next request"
            );
            tokio::time::sleep(rate_limit_delay).await;
        }

        stats.database_count = match self.store.count_exercises().await {
            Ok(count) => {
                metrics::STORED_EXERCISES.set(i64::try_from(count).unwrap_or(i64::MAX));
                Some(count)
            }
            Err(error) => {
                tracing::error!(%error, "Error counting stored exercises");
                None
            }
        };

        tracing::info!(
            total_fetched = stats.total_fetched,
            total_saved = stats.total_saved,
            database_count = ?stats.database_count,
            failed_fetches = stats.failed_fetches,
            aborted = stats.aborted,
            "Fetch complete"
        );

        stats
    }

    /// Count plus the top body parts and equipment
    ///
    /// Any storage failure yields an empty [`CollectionStats`].
    pub async fn collection_stats(&self) -> CollectionStats {
        match self.try_collection_stats().await {
            Ok(stats) => stats,
            Err(error) => {
                tracing::error!(%error, "Error getting collection stats");
                CollectionStats::default()
            }
        }
    }

    async fn try_collection_stats(&self) -> crate::error::Result<CollectionStats> {
        Ok(CollectionStats {
            total_count: self.store.count_exercises().await?,
            top_body_parts: self
                .store
                .top_values(IndexedField::BodyPart, TOP_GROUPS)
                .await?,
            top_equipment: self
                .store
                .top_values(IndexedField::Equipment, TOP_GROUPS)
                .await?,
        })
    }
}
