//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite document store for exercises
//! - Index setup and aggregates

mod database;
mod models;

pub use database::Database;
pub use models::*;

use async_trait::async_trait;

use crate::error::AppError;

/// Storage seam used by the synchronizer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExerciseStore: Send + Sync {
    /// Insert or overwrite `records`, returning how many were inserted or changed
    async fn upsert_exercises(&self, records: &[ExerciseRecord]) -> Result<u64, AppError>;

    /// Current number of stored exercises
    async fn count_exercises(&self) -> Result<u64, AppError>;

    /// Largest groups of `field`, at most `limit`
    async fn top_values(&self, field: IndexedField, limit: u32)
    -> Result<Vec<FieldCount>, AppError>;
}

#[async_trait]
impl ExerciseStore for Database {
    async fn upsert_exercises(&self, records: &[ExerciseRecord]) -> Result<u64, AppError> {
        Database::upsert_exercises(self, records).await
    }

    async fn count_exercises(&self) -> Result<u64, AppError> {
        Database::count_exercises(self).await
    }

    async fn top_values(
        &self,
        field: IndexedField,
        limit: u32,
    ) -> Result<Vec<FieldCount>, AppError> {
        Database::top_values(self, field, limit).await
    }
}
