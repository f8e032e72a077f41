//! Classification inputs and outputs, plus the persisted history log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-context scores. Ordered so that ties resolve the same way on every run.
pub type ScoreMap = BTreeMap<String, f64>;

/// Raw signals captured for one page view. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSignal {
    pub url: String,
    pub title: String,
    pub full_text: String,
    pub meta_description: String,
    pub meta_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryContext {
    pub context: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextResult {
    pub primary_context: String,
    pub confidence: f64,
    pub secondary_contexts: Vec<SecondaryContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<ScoreMap>,
}

impl ContextResult {
    /// Result used when nothing scored or classification failed.
    pub fn general() -> Self {
        Self {
            primary_context: crate::classifier::catalog::GENERAL.to_string(),
            confidence: 1.0,
            secondary_contexts: Vec::new(),
            features: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextHistoryEntry {
    pub context: String,
    pub url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
}

/// Derived from two adjacent history entries whose contexts differ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextSwitch {
    pub from: String,
    pub to: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub from_url: String,
    pub to_url: String,
}
