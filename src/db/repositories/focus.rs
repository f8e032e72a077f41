use anyhow::Result;

use crate::db::{keys, models::WindowSnapshot, Database};
use crate::focus::FocusState;

impl Database {
    /// Current policy; an absent or unreadable value is an inactive session.
    pub async fn get_focus_state(&self) -> Result<FocusState> {
        Ok(self
            .get_value::<FocusState>(keys::FOCUS_STATE)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_focus_state(&self, state: &FocusState) -> Result<()> {
        self.set_value(keys::FOCUS_STATE, state).await
    }

    pub async fn get_focus_backup(&self) -> Result<Vec<WindowSnapshot>> {
        Ok(self
            .get_value::<Vec<WindowSnapshot>>(keys::FOCUS_BACKUP)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_focus_backup(&self, windows: &[WindowSnapshot]) -> Result<()> {
        self.set_value(keys::FOCUS_BACKUP, &windows).await
    }

    pub async fn clear_focus_backup(&self) -> Result<()> {
        self.set_value(keys::FOCUS_BACKUP, &Vec::<WindowSnapshot>::new())
            .await
    }
}
