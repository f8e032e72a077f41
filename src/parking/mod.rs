//! Links deferred during a focus session, reopened when it ends.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};

use crate::db::{models::ParkedLink, Database};
use crate::focus::BrowserSurface;

pub const PARKED_GROUP_TITLE: &str = "Parked Links";
pub const PARKED_GROUP_COLOR: &str = "blue";

#[derive(Clone)]
pub struct ParkingLot {
    db: Database,
    browser: Arc<dyn BrowserSurface>,
}

impl ParkingLot {
    pub fn new(db: Database, browser: Arc<dyn BrowserSurface>) -> Self {
        Self { db, browser }
    }

    /// Returns `false` if the URL was already parked.
    pub async fn save_for_later(&self, url: &str, context: &str, title: Option<String>) -> Result<bool> {
        self.db
            .park_link(ParkedLink {
                url: url.to_string(),
                title,
                context: context.to_string(),
                timestamp: Utc::now(),
            })
            .await
    }

    pub async fn parked_links(&self) -> Result<Vec<ParkedLink>> {
        self.db.get_parked_links().await
    }

    /// Opens every parked link in one group and empties the list. Tabs that
    /// fail to open are logged and dropped; the rest stay open.
    pub async fn release_parked_links(&self) -> Result<usize> {
        let links = self.db.take_parked_links().await?;
        if links.is_empty() {
            return Ok(0);
        }

        let mut opened = Vec::with_capacity(links.len());
        for link in &links {
            match self.browser.open_tab(&link.url, false).await {
                Ok(tab_id) => opened.push(tab_id),
                Err(err) => warn!("Failed to open parked link {}: {err:#}", link.url),
            }
        }

        if !opened.is_empty() {
            if let Err(err) = self
                .browser
                .group_tabs(&opened, PARKED_GROUP_TITLE, PARKED_GROUP_COLOR)
                .await
            {
                warn!("Failed to group parked links: {err:#}");
            }
        }

        info!("Released {} of {} parked links", opened.len(), links.len());
        Ok(opened.len())
    }
}
