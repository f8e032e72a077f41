//! Named tab-group layouts saved at the end of a session.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use log::warn;

use crate::db::{models::SavedWorkspace, Database};
use crate::focus::BrowserSurface;

#[derive(Clone)]
pub struct Workspaces {
    db: Database,
    browser: Arc<dyn BrowserSurface>,
}

impl Workspaces {
    pub fn new(db: Database, browser: Arc<dyn BrowserSurface>) -> Self {
        Self { db, browser }
    }

    pub async fn save_current(&self, name: &str) -> Result<SavedWorkspace> {
        let workspace = SavedWorkspace {
            name: name.to_string(),
            tab_groups: self.browser.tab_groups().await?,
            timestamp: Utc::now(),
        };
        self.db.save_workspace(workspace.clone()).await?;
        Ok(workspace)
    }

    /// Reopens every group of the named workspace. Returns `false` when no
    /// workspace has that name.
    pub async fn restore(&self, name: &str) -> Result<bool> {
        let Some(workspace) = self.db.find_workspace(name).await? else {
            return Ok(false);
        };

        for group in &workspace.tab_groups {
            let mut tab_ids = Vec::with_capacity(group.tab_urls.len());
            for url in &group.tab_urls {
                match self.browser.open_tab(url, false).await {
                    Ok(tab_id) => tab_ids.push(tab_id),
                    Err(err) => warn!("Failed to reopen {url}: {err:#}"),
                }
            }
            if tab_ids.is_empty() {
                continue;
            }
            if let Err(err) = self
                .browser
                .group_tabs(&tab_ids, &group.title, &group.color)
                .await
            {
                warn!("Failed to regroup '{}': {err:#}", group.title);
            }
        }
        Ok(true)
    }

    pub async fn remove(&self, name: &str) -> Result<bool> {
        self.db.remove_workspace(name).await
    }

    pub async fn list(&self) -> Result<Vec<SavedWorkspace>> {
        self.db.get_saved_workspaces().await
    }
}
