//! SQLite document store
//!
//! All database access goes through this module.
//! Documents live in the `exercises` table; field lookups and aggregates
//! use SQLite JSON functions over the stored document.

use std::path::Path;

use sqlx::{Pool, QueryBuilder, Row, Sqlite, SqlitePool};

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
///
/// One handle is created per process and shared by reference; call
/// [`Database::close`] before exiting so pending writes are flushed.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Escape `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Migration(e)
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database connection closed");
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    /// Create the lookup indexes
    ///
    /// Unique on `id`, case-insensitive expression indexes on the document
    /// fields in [`IndexedField::ALL`]. Existing indexes are left untouched.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_exercises_id ON exercises (id)")
            .execute(&self.pool)
            .await?;

        for field in IndexedField::ALL {
            // Index expressions cannot take bound parameters; both parts are static.
            let statement = format!(
                "CREATE INDEX IF NOT EXISTS {} ON exercises ({} COLLATE NOCASE)",
                field.index_name(),
                field.extract_sql()
            );
            sqlx::query(&statement).execute(&self.pool).await?;
        }

        tracing::info!("Created database indexes");
        Ok(())
    }

    /// Names of the indexes on `exercises`
    pub async fn index_names(&self) -> Result<Vec<String>, AppError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'exercises' AND sql IS NOT NULL ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert or overwrite exercises keyed by `id`
    ///
    /// The batch runs in one transaction. A row whose stored document is
    /// identical to the incoming one is left untouched, timestamp included.
    ///
    /// # Returns
    /// Number of records inserted or actually changed
    pub async fn upsert_exercises(&self, records: &[ExerciseRecord]) -> Result<u64, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for record in records {
            let document = serde_json::to_string(&record.document)?;
            let result = sqlx::query(
                r#"
                INSERT INTO exercises (id, document, last_updated)
                VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    document = excluded.document,
                    last_updated = excluded.last_updated
                WHERE exercises.document IS NOT excluded.document
                "#,
            )
            .bind(&record.id)
            .bind(&document)
            .bind(record.last_updated)
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Count stored exercises
    pub async fn count_exercises(&self) -> Result<u64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM exercises")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Get one exercise by its natural key
    pub async fn get_exercise(&self, id: &str) -> Result<Option<ExerciseRecord>, AppError> {
        let row = sqlx::query_as::<_, ExerciseRow>(
            "SELECT id, document, last_updated FROM exercises WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExerciseRecord::try_from).transpose()
    }

    /// Case-insensitive substring search on `name`
    pub async fn search_by_name(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<ExerciseRecord>, AppError> {
        let filter = ExerciseFilter {
            search: Some(query.to_string()),
            ..Default::default()
        };
        self.query_exercises(&filter, limit).await
    }

    /// Exercises matching every criterion of `filter`, ordered by id
    pub async fn query_exercises(
        &self,
        filter: &ExerciseFilter,
        limit: u32,
    ) -> Result<Vec<ExerciseRecord>, AppError> {
        let mut query_builder = QueryBuilder::<Sqlite>::new("");
        push_filter_query(&mut query_builder, filter, limit);

        let rows = query_builder
            .build_query_as::<ExerciseRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ExerciseRecord::try_from).collect()
    }

    /// Sorted distinct non-empty values of `field`
    pub async fn distinct_values(&self, field: IndexedField) -> Result<Vec<String>, AppError> {
        let expr = field.extract_sql();
        let statement = format!(
            r#"
            SELECT DISTINCT CAST({expr} AS TEXT) AS field_value
            FROM exercises
            WHERE {expr} IS NOT NULL AND {expr} <> ''
            ORDER BY field_value COLLATE NOCASE, field_value
            "#
        );

        let values = sqlx::query_scalar::<_, String>(&statement)
            .fetch_all(&self.pool)
            .await?;

        Ok(values)
    }

    /// Body parts, equipment and target muscles present in the store
    pub async fn filter_options(&self) -> Result<FilterOptions, AppError> {
        Ok(FilterOptions {
            body_parts: self.distinct_values(IndexedField::BodyPart).await?,
            equipment: self.distinct_values(IndexedField::Equipment).await?,
            targets: self.distinct_values(IndexedField::Target).await?,
        })
    }

    /// Grouped count over `field`, largest groups first
    ///
    /// Ties are ordered by value so output is stable. Documents without the
    /// field form one group with value `None`.
    pub async fn top_values(
        &self,
        field: IndexedField,
        limit: u32,
    ) -> Result<Vec<FieldCount>, AppError> {
        let statement = format!(
            r#"
            SELECT CAST({} AS TEXT) AS field_value,
                   COUNT(*) AS group_count
            FROM exercises
            GROUP BY field_value
            ORDER BY group_count DESC, field_value ASC
            LIMIT ?
            "#,
            field.extract_sql()
        );

        let rows = sqlx::query(&statement)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<FieldCount, AppError> {
                Ok(FieldCount {
                    value: row.try_get::<Option<String>, _>("field_value")?,
                    count: row.try_get::<i64, _>("group_count")?.max(0) as u64,
                })
            })
            .collect()
    }
}

/// Append the `SELECT` for `filter` to `query_builder`
///
/// Equality criteria compare with `NOCASE` against the literal field
/// expression so the matching expression index applies.
pub(crate) fn push_filter_query(
    query_builder: &mut QueryBuilder<'_, Sqlite>,
    filter: &ExerciseFilter,
    limit: u32,
) {
    query_builder.push("SELECT id, document, last_updated FROM exercises WHERE 1 = 1");

    if let Some(search) = filter.search_term() {
        query_builder
            .push(" AND ")
            .push(IndexedField::Name.extract_sql())
            .push(" LIKE ")
            .push_bind(format!("%{}%", escape_like(search)))
            .push(" ESCAPE '\\'");
    }

    if let Some(muscle) = ExerciseFilter::choice(&filter.muscle) {
        query_builder
            .push(" AND (")
            .push(IndexedField::Target.extract_sql())
            .push(" = ")
            .push_bind(muscle.to_string())
            .push(" COLLATE NOCASE OR EXISTS (SELECT 1 FROM json_each(document, '$.secondaryMuscles')")
            .push(" AS secondary WHERE secondary.value = ")
            .push_bind(muscle.to_string())
            .push(" COLLATE NOCASE))");
    }

    for (field, value) in [
        (IndexedField::BodyPart, &filter.body_part),
        (IndexedField::Equipment, &filter.equipment),
    ] {
        if let Some(value) = ExerciseFilter::choice(value) {
            query_builder
                .push(" AND ")
                .push(field.extract_sql())
                .push(" = ")
                .push_bind(value.to_string())
                .push(" COLLATE NOCASE");
        }
    }

    query_builder
        .push(" ORDER BY id LIMIT ")
        .push_bind(i64::from(limit));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("push-up"), "push-up");
    }
}
