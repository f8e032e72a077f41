use anyhow::Result;

use crate::db::{helpers::push_capped, keys, models::ContextHistoryEntry, Database};

pub const CONTEXT_HISTORY_CAP: usize = 100;

impl Database {
    /// Entries oldest first.
    pub async fn get_context_history(&self) -> Result<Vec<ContextHistoryEntry>> {
        Ok(self
            .get_value(keys::CONTEXT_HISTORY)
            .await?
            .unwrap_or_default())
    }

    pub async fn append_context_history(&self, entry: ContextHistoryEntry) -> Result<()> {
        self.update_value(keys::CONTEXT_HISTORY, move |history: &mut Vec<ContextHistoryEntry>| {
            push_capped(history, entry, CONTEXT_HISTORY_CAP)
        })
        .await
    }
}
