use anyhow::Result;

use crate::db::{keys, models::SavedWorkspace, Database};

impl Database {
    pub async fn get_saved_workspaces(&self) -> Result<Vec<SavedWorkspace>> {
        Ok(self
            .get_value(keys::SAVED_WORKSPACES)
            .await?
            .unwrap_or_default())
    }

    pub async fn find_workspace(&self, name: &str) -> Result<Option<SavedWorkspace>> {
        Ok(self
            .get_saved_workspaces()
            .await?
            .into_iter()
            .find(|workspace| workspace.name == name))
    }

    /// Saves `workspace`, replacing any earlier one with the same name.
    pub async fn save_workspace(&self, workspace: SavedWorkspace) -> Result<()> {
        self.update_value(keys::SAVED_WORKSPACES, move |saved: &mut Vec<SavedWorkspace>| {
            saved.retain(|existing| existing.name != workspace.name);
            saved.push(workspace);
        })
        .await
    }

    pub async fn remove_workspace(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.update_value(keys::SAVED_WORKSPACES, move |saved: &mut Vec<SavedWorkspace>| {
            let before = saved.len();
            saved.retain(|existing| existing.name != name);
            saved.len() != before
        })
        .await
    }
}
