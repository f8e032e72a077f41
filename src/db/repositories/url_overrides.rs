use anyhow::Result;

use crate::db::{keys, models::UrlPatternOverride, Database};
use crate::overrides::sort_by_precedence;

impl Database {
    /// Stored overrides in resolution order.
    pub async fn get_url_pattern_overrides(&self) -> Result<Vec<UrlPatternOverride>> {
        let mut overrides: Vec<UrlPatternOverride> = self
            .get_value(keys::URL_PATTERN_OVERRIDES)
            .await?
            .unwrap_or_default();
        sort_by_precedence(&mut overrides);
        Ok(overrides)
    }

    pub async fn add_url_pattern_override(&self, entry: UrlPatternOverride) -> Result<()> {
        self.update_value(
            keys::URL_PATTERN_OVERRIDES,
            move |overrides: &mut Vec<UrlPatternOverride>| {
                // Newest first so that a full tie resolves to the latest insert.
                overrides.insert(0, entry);
                sort_by_precedence(overrides);
            },
        )
        .await
    }

    /// Removes every override whose pattern equals `pattern`.
    pub async fn remove_url_pattern_override(&self, pattern: &str) -> Result<usize> {
        let pattern = pattern.to_string();
        self.update_value(
            keys::URL_PATTERN_OVERRIDES,
            move |overrides: &mut Vec<UrlPatternOverride>| {
                let before = overrides.len();
                overrides.retain(|entry| entry.pattern != pattern);
                before - overrides.len()
            },
        )
        .await
    }
}
