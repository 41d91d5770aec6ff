//! Keyword-based log classifier

use serde::{Deserialize, Serialize};

/// Classification verdict for a single log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Anomaly,
    Normal,
}

impl Prediction {
    pub fn as_str(self) -> &'static str {
        match self {
            Prediction::Anomaly => "anomaly",
            Prediction::Normal => "normal",
        }
    }
}

/// Keywords that mark a message as an anomaly.
const DEFAULT_KEYWORDS: &[&str] = &["error", "failed", "exception", "timeout"];

/// Case-insensitive keyword matcher applied to every ingested message.
///
/// Built once at startup and shared read-only across requests; a record's
/// prediction is a snapshot taken at ingest time and never re-evaluated.
#[derive(Debug, Clone)]
pub struct LogClassifier {
    keywords: Vec<String>,
}

impl Default for LogClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().map(|kw| (*kw).to_string()).collect())
    }
}

impl LogClassifier {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|kw| kw.to_lowercase()).collect(),
        }
    }

    /// Classify a message: any keyword hit means anomaly.
    pub fn classify(&self, message: &str) -> Prediction {
        let message = message.to_lowercase();
        if self.keywords.iter().any(|kw| message.contains(kw.as_str())) {
            Prediction::Anomaly
        } else {
            Prediction::Normal
        }
    }
}
