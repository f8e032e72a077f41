use anyhow::Result;

use crate::db::{keys, models::ParkedLink, Database};

impl Database {
    pub async fn get_parked_links(&self) -> Result<Vec<ParkedLink>> {
        Ok(self
            .get_value(keys::PARKED_LINKS)
            .await?
            .unwrap_or_default())
    }

    /// Returns `false` when the URL is already parked.
    pub async fn park_link(&self, link: ParkedLink) -> Result<bool> {
        self.update_value(keys::PARKED_LINKS, move |links: &mut Vec<ParkedLink>| {
            if links.iter().any(|existing| existing.url == link.url) {
                return false;
            }
            links.push(link);
            true
        })
        .await
    }

    /// Empties the list and hands back what it held.
    pub async fn take_parked_links(&self) -> Result<Vec<ParkedLink>> {
        self.update_value(keys::PARKED_LINKS, |links: &mut Vec<ParkedLink>| {
            std::mem::take(links)
        })
        .await
    }
}
