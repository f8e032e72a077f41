use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::db::{helpers::datetime_from_millis, keys, Database};

/// Session keys written before `focusState` existed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacySession {
    pub active: Option<bool>,
    pub end_time: Option<DateTime<Utc>>,
    pub blocked_categories: Option<Vec<String>>,
}

impl LegacySession {
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.end_time.is_none() && self.blocked_categories.is_none()
    }
}

impl Database {
    pub async fn get_legacy_session(&self) -> Result<LegacySession> {
        let active = self.get_value::<bool>(keys::LEGACY_SESSION_ACTIVE).await?;
        let end_time = self
            .get_value::<i64>(keys::LEGACY_SESSION_END_TIME)
            .await?
            .and_then(datetime_from_millis);
        let blocked_categories = self
            .get_value::<Vec<String>>(keys::LEGACY_BLOCKED_CATEGORIES)
            .await?;

        Ok(LegacySession {
            active,
            end_time,
            blocked_categories,
        })
    }

    pub async fn clear_legacy_session(&self) -> Result<()> {
        self.remove_keys(&[
            keys::LEGACY_SESSION_ACTIVE,
            keys::LEGACY_SESSION_END_TIME,
            keys::LEGACY_BLOCKED_CATEGORIES,
        ])
        .await
    }

    /// Bare path prefixes from the oldest override format.
    pub async fn get_path_overrides(&self) -> Result<Vec<String>> {
        Ok(self
            .get_value(keys::PATH_OVERRIDES)
            .await?
            .unwrap_or_default())
    }

    pub async fn clear_path_overrides(&self) -> Result<()> {
        self.remove_keys(&[keys::PATH_OVERRIDES]).await
    }
}
