//! Remote exercise catalog
//!
//! Handles:
//! - Paginated `GET /exercises` requests
//! - Decoding of the `{ data, total }` envelope
//! - Per-request timeout and status mapping

mod client;

pub use client::CatalogClient;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::FetchError;

/// One page of the catalog
///
/// Entries are kept as raw JSON; shape checks happen when they are turned
/// into records. A `data` that is missing, null or not an array reads as
/// an empty page, and a `total` that is not a non-negative integer reads as
/// unknown.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PageResponse {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub data: Vec<Value>,
    /// Total number of records the API claims to have
    #[serde(default, deserialize_with = "lenient_total")]
    pub total: Option<u64>,
}

fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(entries) => Ok(entries),
        _ => Ok(Vec::new()),
    }
}

fn lenient_total<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_u64())
}

impl PageResponse {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Source of catalog pages used by the synchronizer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExerciseSource: Send + Sync {
    /// Fetch `limit` records starting at `offset`
    async fn fetch_page(&self, offset: u64, limit: u32) -> Result<PageResponse, FetchError>;

    /// Total declared by the API, `None` if it cannot be determined
    async fn total_count(&self) -> Option<u64>;
}
