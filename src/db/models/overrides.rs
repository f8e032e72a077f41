//! User and feedback-derived corrections that supersede the classifier.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain-wide overrides, keyed by hostname.
pub type DomainContextMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Exact,
    StartsWith,
    /// Anything written by a newer or older client that we cannot interpret.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UrlPatternOverride {
    pub pattern: String,
    pub context: String,
    pub priority: i64,
    pub match_type: MatchType,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
