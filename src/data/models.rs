//! Data models
//!
//! Exercises are stored as opaque JSON documents. Only the natural key
//! (`id`) and the write timestamp are lifted out into columns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// JSON object as returned by the catalog API
pub type Document = serde_json::Map<String, Value>;

/// Name of the natural key field inside every document
pub const ID_FIELD: &str = "id";

/// Name of the timestamp added at write time
pub const LAST_UPDATED_FIELD: &str = "last_updated";

// =============================================================================
// Exercise
// =============================================================================

/// One exercise as mirrored from the catalog
///
/// `document` is the upstream object verbatim; nothing beyond the presence
/// of a usable `id` is validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRecord {
    pub id: String,
    pub document: Document,
    pub last_updated: DateTime<Utc>,
}

impl ExerciseRecord {
    /// Build a record from a raw API entry, stamping it with `last_updated`
    ///
    /// # Errors
    /// `AppError::Validation` if the entry is not an object or its `id` is
    /// missing, empty, or neither a string nor a number.
    pub fn from_api(value: Value, last_updated: DateTime<Utc>) -> Result<Self, AppError> {
        let Value::Object(document) = value else {
            return Err(AppError::Validation(
                "catalog entry is not a JSON object".to_string(),
            ));
        };

        let id = match document.get(ID_FIELD) {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "catalog entry has unusable id: {}",
                    other
                )));
            }
            None => {
                return Err(AppError::Validation(
                    "catalog entry has no id".to_string(),
                ));
            }
        };

        Ok(Self {
            id,
            document,
            last_updated,
        })
    }

    /// Get a top-level document field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// Exercise name, if the upstream record carries one
    pub fn name(&self) -> Option<&str> {
        self.field("name").and_then(Value::as_str)
    }

    /// The stored document including its `last_updated` timestamp
    pub fn to_json(&self) -> Value {
        let mut document = self.document.clone();
        document.insert(
            LAST_UPDATED_FIELD.to_string(),
            Value::String(self.last_updated.to_rfc3339()),
        );
        Value::Object(document)
    }
}

/// Raw `exercises` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ExerciseRow {
    pub id: String,
    pub document: String,
    pub last_updated: DateTime<Utc>,
}

impl TryFrom<ExerciseRow> for ExerciseRecord {
    type Error = AppError;

    fn try_from(row: ExerciseRow) -> Result<Self, Self::Error> {
        let document: Document = serde_json::from_str(&row.document)?;
        Ok(Self {
            id: row.id,
            document,
            last_updated: row.last_updated,
        })
    }
}

// =============================================================================
// Indexed fields & aggregates
// =============================================================================

/// Document fields with a secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedField {
    Name,
    Target,
    BodyPart,
    Equipment,
}

impl IndexedField {
    pub const ALL: [IndexedField; 4] = [
        IndexedField::Name,
        IndexedField::Target,
        IndexedField::BodyPart,
        IndexedField::Equipment,
    ];

    /// `json_extract` over the stored document
    ///
    /// Lookups must use this exact text to match the index expressions.
    pub(crate) fn extract_sql(self) -> &'static str {
        match self {
            IndexedField::Name => "json_extract(document, '$.name')",
            IndexedField::Target => "json_extract(document, '$.target')",
            IndexedField::BodyPart => "json_extract(document, '$.bodyPart')",
            IndexedField::Equipment => "json_extract(document, '$.equipment')",
        }
    }

    pub(crate) fn index_name(self) -> &'static str {
        match self {
            IndexedField::Name => "idx_exercises_name",
            IndexedField::Target => "idx_exercises_target",
            IndexedField::BodyPart => "idx_exercises_body_part",
            IndexedField::Equipment => "idx_exercises_equipment",
        }
    }
}

/// Combined lookup over stored exercises
///
/// Every criterion that is set must match. Values compare ignoring ASCII
/// case. For `muscle`, `body_part` and `equipment` the value `all` means no
/// restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseFilter {
    /// Substring of `name`
    pub search: Option<String>,
    /// Equal to `target` or to any entry of `secondaryMuscles`
    pub muscle: Option<String>,
    pub body_part: Option<String>,
    pub equipment: Option<String>,
}

impl ExerciseFilter {
    pub(crate) fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Selected value of a muscle / body part / equipment criterion
    pub(crate) fn choice(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("all"))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.search_term().is_none()
            && [&self.muscle, &self.body_part, &self.equipment]
                .into_iter()
                .all(|value| Self::choice(value).is_none())
    }
}

/// Distinct values available for filtering, each sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub body_parts: Vec<String>,
    pub equipment: Vec<String>,
    pub targets: Vec<String>,
}

/// One group of a grouped count
///
/// `value` is `None` for documents that lack the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCount {
    pub value: Option<String>,
    pub count: u64,
}

/// Summary aggregates over the stored collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub total_count: u64,
    pub top_body_parts: Vec<FieldCount>,
    pub top_equipment: Vec<FieldCount>,
}

impl CollectionStats {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0 && self.top_body_parts.is_empty() && self.top_equipment.is_empty()
    }
}
