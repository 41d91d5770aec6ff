//! Log ingestion, query, and deletion handlers

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::filter;
use crate::models::{IngestResponse, LogRecord, NewLog};
use crate::AppState;

/// Ingest a single log entry or a batch.
///
/// The body is parsed by hand rather than through the `Json` extractor so
/// a malformed body produces the service's own 400 response. The backend
/// check comes first: a degraded service rejects even unparseable requests
/// with the unavailability error.
pub async fn ingest(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<IngestResponse>> {
    let pool = state.backend.pool()?;

    let data: Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))?;
    let entries = match data {
        Value::Array(entries) if !entries.is_empty() => entries,
        Value::Object(map) if !map.is_empty() => vec![Value::Object(map)],
        _ => return Err(AppError::BadRequest("Invalid JSON".to_string())),
    };

    let received = entries.len();
    let mut accepted = Vec::new();
    for raw in entries {
        // a bad timestamp anywhere aborts the whole batch; entries without
        // a message are dropped without aborting
        if let Some(entry) = NewLog::from_raw(raw, &state.classifier)? {
            accepted.push(entry);
        }
    }
    if accepted.len() < received {
        tracing::debug!("Dropped {} entries without a message", received - accepted.len());
    }

    let ingested = if accepted.is_empty() {
        0
    } else {
        LogRecord::insert_many(pool, accepted).await?
    };

    Ok(Json(IngestResponse {
        status: "success",
        ingested,
    }))
}

/// Query logs with ad-hoc filters, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> AppResult<Json<Vec<Value>>> {
    let pool = state.backend.pool()?;

    let clauses = filter::build_filter(&params)?;
    let records = LogRecord::find(pool, &clauses).await?;

    Ok(Json(records.into_iter().map(LogRecord::into_json).collect()))
}

/// Delete a single log record by id.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let pool = state.backend.pool()?;

    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest(format!("Invalid log id \"{id}\"")))?;

    if LogRecord::delete_by_id(pool, id).await? {
        Ok(Json(json!({ "status": "success", "message": "Log deleted" })))
    } else {
        Err(AppError::NotFound("Log not found".to_string()))
    }
}
