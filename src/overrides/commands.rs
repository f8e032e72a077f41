use chrono::Utc;
use serde::Deserialize;

use crate::db::models::{MatchType, UrlPatternOverride};
use crate::AppState;

/// An override as submitted; the creation time is stamped on arrival.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUrlPatternOverride {
    pub pattern: String,
    pub context: String,
    #[serde(default)]
    pub priority: i64,
    pub match_type: MatchType,
    #[serde(default)]
    pub description: Option<String>,
}

async fn recompile(state: &AppState) -> Result<(), String> {
    state
        .rules
        .apply_allowed_contexts()
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

pub async fn add_url_pattern_override(
    state: &AppState,
    entry: NewUrlPatternOverride,
) -> Result<(), String> {
    if entry.pattern.trim().is_empty() {
        return Err("URL pattern must not be empty".into());
    }
    state
        .db
        .add_url_pattern_override(UrlPatternOverride {
            pattern: entry.pattern,
            context: entry.context,
            priority: entry.priority,
            match_type: entry.match_type,
            created_at: Utc::now(),
            description: entry.description,
        })
        .await
        .map_err(|e| e.to_string())?;
    recompile(state).await
}

pub async fn remove_url_pattern_override(state: &AppState, pattern: &str) -> Result<usize, String> {
    let removed = state
        .db
        .remove_url_pattern_override(pattern)
        .await
        .map_err(|e| e.to_string())?;
    recompile(state).await?;
    Ok(removed)
}

/// `false` when the domain is multi-purpose and was left out of the map.
pub async fn set_domain_context(
    state: &AppState,
    domain: &str,
    context: &str,
) -> Result<bool, String> {
    let written = state
        .db
        .set_domain_context(domain, context)
        .await
        .map_err(|e| e.to_string())?;
    recompile(state).await?;
    Ok(written)
}

pub async fn remove_domain_context(state: &AppState, domain: &str) -> Result<bool, String> {
    let removed = state
        .db
        .remove_domain_context(domain)
        .await
        .map_err(|e| e.to_string())?;
    recompile(state).await?;
    Ok(removed)
}
