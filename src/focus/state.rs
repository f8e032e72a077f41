use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// The single, persisted focus policy.
///
/// `allowed_contexts` is `None` when the stored list was not a list of
/// strings. Such a policy blocks nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusState {
    #[serde(default)]
    pub active: bool,
    #[serde(
        default = "empty_allowed_contexts",
        deserialize_with = "lenient_allowed_contexts"
    )]
    pub allowed_contexts: Option<Vec<String>>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

fn empty_allowed_contexts() -> Option<Vec<String>> {
    Some(Vec::new())
}

fn lenient_allowed_contexts<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl Default for FocusState {
    fn default() -> Self {
        Self {
            active: false,
            allowed_contexts: empty_allowed_contexts(),
            end_time: None,
            session_id: None,
        }
    }
}

impl FocusState {
    pub fn started(
        allowed_contexts: Vec<String>,
        duration_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            active: true,
            allowed_contexts: Some(allowed_contexts),
            end_time: duration_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| now + Duration::minutes(i64::from(minutes))),
            session_id: Some(Uuid::new_v4().to_string()),
        }
    }

    /// Inactive copy that keeps the last allowed list.
    pub fn ended(&self) -> Self {
        Self {
            active: false,
            allowed_contexts: self.allowed_contexts.clone(),
            end_time: None,
            session_id: None,
        }
    }

    pub fn is_blocked(&self, context: &str) -> bool {
        if !self.active {
            return false;
        }
        match &self.allowed_contexts {
            Some(allowed) => !allowed.iter().any(|label| label == context),
            None => false,
        }
    }

    pub fn is_allowed(&self, context: &str) -> bool {
        self.allowed_contexts
            .as_ref()
            .is_some_and(|allowed| allowed.iter().any(|label| label == context))
    }

    /// Seconds left: 0 when inactive, -1 for an unlimited session.
    pub fn time_left_secs(&self, now: DateTime<Utc>) -> f64 {
        if !self.active {
            return 0.0;
        }
        match self.end_time {
            None => -1.0,
            Some(end_time) => (end_time - now).num_milliseconds().max(0) as f64 / 1000.0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.active && self.end_time.is_some_and(|end_time| end_time <= now)
    }
}
