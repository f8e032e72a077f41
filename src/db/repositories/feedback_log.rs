use anyhow::Result;

use crate::db::{helpers::push_capped, keys, models::ClassificationFeedback, Database};

pub const FEEDBACK_LOG_CAP: usize = 200;

impl Database {
    pub async fn get_feedback_log(&self) -> Result<Vec<ClassificationFeedback>> {
        Ok(self
            .get_value(keys::FEEDBACK_LOG)
            .await?
            .unwrap_or_default())
    }

    pub async fn append_feedback(&self, entry: ClassificationFeedback) -> Result<()> {
        self.update_value(keys::FEEDBACK_LOG, move |log: &mut Vec<ClassificationFeedback>| {
            push_capped(log, entry, FEEDBACK_LOG_CAP)
        })
        .await
    }

    pub async fn clear_feedback_log(&self) -> Result<()> {
        self.set_value(keys::FEEDBACK_LOG, &Vec::<ClassificationFeedback>::new())
            .await
    }
}
