use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;

use super::switches::{self, FocusStatus};
use crate::classifier::catalog::UNKNOWN;
use crate::db::{
    models::{ContextHistoryEntry, ContextSwitch},
    Database,
};

#[derive(Debug, Clone)]
struct Latest {
    context: String,
    url: String,
}

/// Records classifications into the persisted history and answers
/// questions about recent switching.
#[derive(Clone)]
pub struct ContextTracker {
    db: Database,
    latest: Arc<Mutex<Latest>>,
}

impl ContextTracker {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            latest: Arc::new(Mutex::new(Latest {
                context: UNKNOWN.to_string(),
                url: String::new(),
            })),
        }
    }

    pub async fn add_context(&self, context: &str, url: &str, confidence: f64) -> Result<()> {
        {
            let mut latest = self.latest.lock().await;
            latest.context = context.to_string();
            latest.url = url.to_string();
        }

        self.db
            .append_context_history(ContextHistoryEntry {
                context: context.to_string(),
                url: url.to_string(),
                timestamp: Utc::now(),
                confidence,
            })
            .await
    }

    pub async fn history(&self) -> Result<Vec<ContextHistoryEntry>> {
        self.db.get_context_history().await
    }

    pub async fn context_switches(&self, window_minutes: u32) -> Result<Vec<ContextSwitch>> {
        let entries = self.history().await?;
        Ok(switches::context_switches(&entries, window_minutes, Utc::now()).collect())
    }

    pub async fn current_streak(&self) -> Result<usize> {
        let entries = self.history().await?;
        Ok(switches::current_streak(&entries))
    }

    pub async fn is_lost_focus(&self, switch_threshold: usize, window_minutes: u32) -> Result<bool> {
        let entries = self.history().await?;
        Ok(switches::is_lost_focus(
            &entries,
            switch_threshold,
            window_minutes,
            Utc::now(),
        ))
    }

    pub async fn check_focus_status(
        &self,
        switch_threshold: usize,
        window_minutes: u32,
    ) -> Result<FocusStatus> {
        let entries = self.history().await?;
        Ok(switches::focus_status(
            &entries,
            switch_threshold,
            window_minutes,
            Utc::now(),
        ))
    }

    /// Last context recorded by this process, `"Unknown"` before the first.
    pub async fn latest_context(&self) -> String {
        self.latest.lock().await.context.clone()
    }

    pub async fn latest_url(&self) -> String {
        self.latest.lock().await.url.clone()
    }
}
