use anyhow::Result;

use crate::db::{helpers::normalize_domain, keys, models::DomainContextMap, Database};
use crate::overrides::is_multi_purpose_domain;

impl Database {
    /// `None` when the map has never been written.
    pub async fn find_domain_context_map(&self) -> Result<Option<DomainContextMap>> {
        self.get_value(keys::DOMAIN_CONTEXT_MAP).await
    }

    pub async fn get_domain_context_map(&self) -> Result<DomainContextMap> {
        Ok(self.find_domain_context_map().await?.unwrap_or_default())
    }

    /// Replaces the whole map. Keys are normalised and multi-purpose domains
    /// are dropped on the way in.
    pub async fn save_domain_context_map(&self, map: &DomainContextMap) -> Result<()> {
        let filtered: DomainContextMap = map
            .iter()
            .map(|(domain, context)| (normalize_domain(domain), context.clone()))
            .filter(|(domain, _)| !domain.is_empty() && !is_multi_purpose_domain(domain))
            .collect();
        self.set_value(keys::DOMAIN_CONTEXT_MAP, &filtered).await
    }

    /// Returns `false` without writing when `domain` is blank or
    /// multi-purpose.
    pub async fn set_domain_context(&self, domain: &str, context: &str) -> Result<bool> {
        let domain = normalize_domain(domain);
        if domain.is_empty() || is_multi_purpose_domain(&domain) {
            return Ok(false);
        }
        let context = context.to_string();
        self.update_value(keys::DOMAIN_CONTEXT_MAP, move |map: &mut DomainContextMap| {
            map.insert(domain, context);
        })
        .await?;
        Ok(true)
    }

    pub async fn remove_domain_context(&self, domain: &str) -> Result<bool> {
        let domain = normalize_domain(domain);
        self.update_value(keys::DOMAIN_CONTEXT_MAP, move |map: &mut DomainContextMap| {
            map.remove(&domain).is_some()
        })
        .await
    }

    /// Removes every multi-purpose entry, returning how many were dropped.
    /// Keys written unnormalised by older versions are folded to lowercase;
    /// on a clash the entry sorting last wins.
    pub async fn strip_multi_purpose_domains(&self) -> Result<usize> {
        self.update_value(keys::DOMAIN_CONTEXT_MAP, |map: &mut DomainContextMap| {
            let before = map.len();
            map.retain(|domain, _| !is_multi_purpose_domain(&normalize_domain(domain)));
            let kept = map.len();
            *map = std::mem::take(map)
                .into_iter()
                .map(|(domain, context)| (normalize_domain(&domain), context))
                .filter(|(domain, _)| !domain.is_empty())
                .collect();
            before - kept
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn multi_purpose_domains_are_never_written() {
        let db = Database::in_memory().unwrap();
        assert!(!db.set_domain_context("docs.google.com", "Work").await.unwrap());
        assert!(db.set_domain_context("notion.so", "Work").await.unwrap());

        let mut map = db.get_domain_context_map().await.unwrap();
        assert_eq!(map.len(), 1);

        map.insert("youtube.com".into(), "Entertainment".into());
        db.save_domain_context_map(&map).await.unwrap();
        assert!(!db
            .get_domain_context_map()
            .await
            .unwrap()
            .contains_key("youtube.com"));
    }

    #[tokio::test]
    async fn strip_removes_existing_multi_purpose_entries() {
        let db = Database::in_memory().unwrap();
        let mut map = DomainContextMap::new();
        map.insert("reddit.com".into(), "Social".into());
        map.insert("bbc.com".into(), "News".into());
        // Bypass the guard to simulate data written by an older version.
        db.set_value(keys::DOMAIN_CONTEXT_MAP, &map).await.unwrap();

        assert_eq!(db.strip_multi_purpose_domains().await.unwrap(), 1);
        let map = db.get_domain_context_map().await.unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["bbc.com"]);
    }

    #[tokio::test]
    async fn remove_reports_whether_entry_existed() {
        let db = Database::in_memory().unwrap();
        db.set_domain_context("bbc.com", "News").await.unwrap();
        assert!(db.remove_domain_context("bbc.com").await.unwrap());
        assert!(!db.remove_domain_context("bbc.com").await.unwrap());
    }

    #[tokio::test]
    async fn domain_keys_are_normalised_on_every_write_and_remove() {
        let db = Database::in_memory().unwrap();
        assert!(db.set_domain_context(" BBC.com ", "News").await.unwrap());
        assert!(!db.set_domain_context("   ", "News").await.unwrap());

        let map = db.get_domain_context_map().await.unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["bbc.com"]);
        assert_eq!(
            crate::overrides::lookup_domain_context("bbc.com", &map),
            Some("News")
        );

        assert!(db.remove_domain_context("BBC.COM").await.unwrap());
        assert!(db.get_domain_context_map().await.unwrap().is_empty());

        let mut bulk = DomainContextMap::new();
        bulk.insert("Notion.SO".into(), "Work".into());
        db.save_domain_context_map(&bulk).await.unwrap();
        assert!(db.get_domain_context_map().await.unwrap().contains_key("notion.so"));
    }

    #[tokio::test]
    async fn strip_folds_legacy_mixed_case_keys() {
        let db = Database::in_memory().unwrap();
        let mut map = DomainContextMap::new();
        map.insert("BBC.com".into(), "News".into());
        map.insert("Reddit.com".into(), "Social".into());
        db.set_value(keys::DOMAIN_CONTEXT_MAP, &map).await.unwrap();

        assert_eq!(db.strip_multi_purpose_domains().await.unwrap(), 1);
        let map = db.get_domain_context_map().await.unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["bbc.com"]);
    }
}
