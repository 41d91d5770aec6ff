//! Query filter construction
//!
//! Translates the ad-hoc query parameters of `GET /logs` into a list of
//! typed filter clauses, then renders that list into a parameterized SQL
//! fragment against the JSONB log store. Clause construction knows nothing
//! about SQL; rendering is the only storage-specific step.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::error::AppResult;
use crate::models::parse_timestamp;

/// Parameter names handled outside the pass-through loop.
const RESERVED: &[&str] = &["message", "startDate", "endDate"];

/// A single condition against the log store.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Case-insensitive substring/regex match on a text field.
    Substring { field: String, pattern: String },
    /// Exact equality on a nested field path (the `metadata.*` namespace).
    Exact { path: Vec<String>, value: String },
    /// Inclusive timestamp range; at least one bound is set.
    Range {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

/// Build filter clauses from raw query parameters.
///
/// `message` becomes a substring match, `startDate`/`endDate` fold into one
/// range clause, `metadata.*` keys become exact matches on the dotted path,
/// and any other key becomes a substring match on the field of that name.
/// Empty values are treated as absent for every key.
pub fn build_filter(params: &BTreeMap<String, String>) -> AppResult<Vec<FilterClause>> {
    let mut clauses = Vec::new();

    if let Some(pattern) = non_empty(params, "message") {
        clauses.push(FilterClause::Substring {
            field: "message".to_string(),
            pattern: pattern.to_string(),
        });
    }

    let start = match non_empty(params, "startDate") {
        Some(raw) => Some(parse_timestamp(raw)?),
        None => None,
    };
    let end = match non_empty(params, "endDate") {
        Some(raw) => Some(parse_timestamp(raw)?),
        None => None,
    };
    if start.is_some() || end.is_some() {
        clauses.push(FilterClause::Range { start, end });
    }

    for (key, value) in params {
        if value.is_empty() || RESERVED.contains(&key.as_str()) {
            continue;
        }
        if key.starts_with("metadata.") {
            clauses.push(FilterClause::Exact {
                path: key.split('.').map(str::to_string).collect(),
                value: value.clone(),
            });
        } else {
            clauses.push(FilterClause::Substring {
                field: key.clone(),
                pattern: value.clone(),
            });
        }
    }

    Ok(clauses)
}

fn non_empty<'a>(params: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str).filter(|value| !value.is_empty())
}

/// Render clauses as a `WHERE` fragment with bound parameters.
///
/// `~*` gives the same case-insensitive regex semantics the store-side
/// substring match requires; `#>>` resolves the dotted metadata path. User
/// input only ever reaches the statement as a bound value.
pub fn push_clauses(builder: &mut QueryBuilder<'_, Postgres>, clauses: &[FilterClause]) {
    if clauses.is_empty() {
        return;
    }

    builder.push(" WHERE ");
    for (idx, clause) in clauses.iter().enumerate() {
        if idx > 0 {
            builder.push(" AND ");
        }
        match clause {
            FilterClause::Substring { field, pattern } => {
                builder.push("(doc ->> ");
                builder.push_bind(field.clone());
                builder.push(") ~* ");
                builder.push_bind(pattern.clone());
            }
            FilterClause::Exact { path, value } => {
                builder.push("(doc #>> ");
                builder.push_bind(path.clone());
                builder.push(") = ");
                builder.push_bind(value.clone());
            }
            FilterClause::Range { start, end } => {
                if let Some(start) = start {
                    builder.push("recorded_at >= ");
                    builder.push_bind(*start);
                    if end.is_some() {
                        builder.push(" AND ");
                    }
                }
                if let Some(end) = end {
                    builder.push("recorded_at <= ");
                    builder.push_bind(*end);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_no_params_builds_no_clauses() {
        let clauses = build_filter(&BTreeMap::new()).unwrap();
        assert!(clauses.is_empty());
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let clauses = build_filter(&params(&[
            ("message", ""),
            ("startDate", ""),
            ("level", ""),
            ("metadata.host", ""),
        ]))
        .unwrap();
        assert!(clauses.is_empty());
    }

    #[test]
    fn test_message_becomes_substring_clause() {
        let clauses = build_filter(&params(&[("message", "timeout")])).unwrap();
        assert_eq!(
            clauses,
            vec![FilterClause::Substring {
                field: "message".to_string(),
                pattern: "timeout".to_string(),
            }]
        );
    }

    #[test]
    fn test_metadata_key_becomes_exact_clause() {
        let clauses = build_filter(&params(&[("metadata.host", "server1")])).unwrap();
        assert_eq!(
            clauses,
            vec![FilterClause::Exact {
                path: vec!["metadata".to_string(), "host".to_string()],
                value: "server1".to_string(),
            }]
        );
    }

    #[test]
    fn test_deep_metadata_path_splits_on_every_dot() {
        let clauses = build_filter(&params(&[("metadata.node.region", "eu-west")])).unwrap();
        assert_eq!(
            clauses,
            vec![FilterClause::Exact {
                path: vec!["metadata".to_string(), "node".to_string(), "region".to_string()],
                value: "eu-west".to_string(),
            }]
        );
    }

    #[test]
    fn test_other_keys_become_substring_clauses() {
        let clauses = build_filter(&params(&[("level", "err")])).unwrap();
        assert_eq!(
            clauses,
            vec![FilterClause::Substring {
                field: "level".to_string(),
                pattern: "err".to_string(),
            }]
        );
    }

    #[test]
    fn test_dates_fold_into_one_range_clause() {
        let clauses = build_filter(&params(&[
            ("startDate", "2024-01-01T00:00:00Z"),
            ("endDate", "2024-01-31T23:59:59Z"),
        ]))
        .unwrap();
        assert_eq!(
            clauses,
            vec![FilterClause::Range {
                start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                end: Some(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()),
            }]
        );
    }

    #[test]
    fn test_start_date_alone_is_a_half_open_range() {
        let clauses = build_filter(&params(&[("startDate", "2024-01-01T00:00:00Z")])).unwrap();
        assert_eq!(
            clauses,
            vec![FilterClause::Range {
                start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                end: None,
            }]
        );
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        assert!(build_filter(&params(&[("startDate", "not-a-date")])).is_err());
        assert!(build_filter(&params(&[("endDate", "01/31/2024")])).is_err());
    }

    #[test]
    fn test_reserved_keys_are_not_passed_through() {
        // message handled once, dates folded into the range, level passed through
        let clauses = build_filter(&params(&[
            ("message", "timeout"),
            ("startDate", "2024-01-01T00:00:00Z"),
            ("level", "error"),
        ]))
        .unwrap();
        assert_eq!(clauses.len(), 3);
    }

    #[test]
    fn test_rendered_sql_is_fully_parameterized() {
        let clauses = build_filter(&params(&[
            ("message", "timeout"),
            ("startDate", "2024-01-01T00:00:00Z"),
            ("endDate", "2024-01-31T23:59:59Z"),
            ("level", "err"),
            ("metadata.host", "server1"),
        ]))
        .unwrap();

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id, recorded_at, doc FROM logs");
        push_clauses(&mut builder, &clauses);

        // build_filter order: message, range, then pass-through keys sorted
        assert_eq!(
            builder.sql(),
            "SELECT id, recorded_at, doc FROM logs WHERE (doc ->> $1) ~* $2 \
             AND recorded_at >= $3 AND recorded_at <= $4 \
             AND (doc ->> $5) ~* $6 \
             AND (doc #>> $7) = $8"
        );
    }

    #[test]
    fn test_no_clauses_renders_no_where() {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id, recorded_at, doc FROM logs");
        push_clauses(&mut builder, &[]);
        assert_eq!(builder.sql(), "SELECT id, recorded_at, doc FROM logs");
    }
}
