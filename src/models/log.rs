//! Log record model and persistence operations

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::classifier::LogClassifier;
use crate::error::{AppError, AppResult};
use crate::filter::{self, FilterClause};

/// A normalized log entry ready for insertion.
///
/// The timestamp is pulled out of the document into its own column so the
/// store can range-filter and sort on it; everything else stays in `doc`
/// verbatim, including the computed `prediction`.
#[derive(Debug, Clone)]
pub struct NewLog {
    pub recorded_at: Option<DateTime<Utc>>,
    pub doc: Map<String, Value>,
}

/// A persisted log row.
#[derive(Debug, Clone, FromRow)]
pub struct LogRecord {
    pub id: Uuid,
    pub recorded_at: Option<DateTime<Utc>>,
    pub doc: Json<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub ingested: u64,
}

impl NewLog {
    /// Normalize one raw batch element.
    ///
    /// Entries that are not objects or carry no `message` string are
    /// rejected with `Ok(None)` and silently dropped from the batch. A
    /// malformed `timestamp` is an error that aborts the whole request.
    pub fn from_raw(raw: Value, classifier: &LogClassifier) -> AppResult<Option<Self>> {
        let Value::Object(mut doc) = raw else {
            return Ok(None);
        };

        let prediction = match doc.get("message").and_then(Value::as_str) {
            Some(message) => classifier.classify(message),
            None => return Ok(None),
        };
        doc.insert(
            "prediction".to_string(),
            Value::String(prediction.as_str().to_string()),
        );

        let recorded_at = match doc.remove("timestamp") {
            Some(Value::String(raw)) => Some(parse_timestamp(&raw)?),
            Some(other) => {
                return Err(AppError::BadRequest(format!("Invalid timestamp: {other}")));
            }
            None => None,
        };

        Ok(Some(NewLog { recorded_at, doc }))
    }
}

impl LogRecord {
    /// Bulk-insert normalized entries, returning how many rows were written.
    pub async fn insert_many(pool: &PgPool, entries: Vec<NewLog>) -> Result<u64, sqlx::Error> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO logs (recorded_at, doc) ");
        builder.push_values(entries, |mut row, entry| {
            row.push_bind(entry.recorded_at)
                .push_bind(Value::Object(entry.doc));
        });

        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Run a filtered query, newest first; rows without a timestamp sort last.
    pub async fn find(pool: &PgPool, clauses: &[FilterClause]) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id, recorded_at, doc FROM logs");
        filter::push_clauses(&mut builder, clauses);
        builder.push(" ORDER BY recorded_at DESC NULLS LAST");

        builder
            .build_query_as::<LogRecord>()
            .fetch_all(pool)
            .await
    }

    /// Delete one record by id; `false` when nothing matched.
    pub async fn delete_by_id(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM logs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Transport form: the stored document plus the stringified id and an
    /// RFC 3339 timestamp.
    pub fn into_json(self) -> Value {
        let mut doc = self.doc.0;
        doc.insert("id".to_string(), Value::String(self.id.to_string()));
        if let Some(recorded_at) = self.recorded_at {
            doc.insert(
                "timestamp".to_string(),
                Value::String(recorded_at.to_rfc3339()),
            );
        }
        Value::Object(doc)
    }
}

/// Parse an ISO-8601 timestamp, accepting a trailing `Z` as `+00:00`.
///
/// Offset-less date-times are taken as UTC; a bare date means midnight UTC.
pub fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    Err(AppError::BadRequest(format!("Invalid timestamp \"{raw}\"")))
}
