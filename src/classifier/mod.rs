//! Page context classification.
//!
//! `ContextEngine::classify` never fails: any internal error degrades to
//! the `General` result, and every result is also written to history.

pub mod algorithm;
pub mod catalog;
pub mod config;
pub mod signals;
pub mod text;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::db::{
    models::{ContextResult, PageSignal},
    Database,
};
use crate::history::ContextTracker;
use crate::{log_error, log_info, log_warn};

pub use algorithm::{combine_scores, format_result, score_page};
pub use catalog::{ContextCatalog, ContextDefinition, KeywordTable};
pub use config::ClassifierConfig;

const ENABLE_LOGS: bool = true;

#[derive(Clone)]
pub struct ContextEngine {
    db: Database,
    catalog: Arc<ContextCatalog>,
    config: ClassifierConfig,
    keywords: Arc<RwLock<Option<Arc<KeywordTable>>>>,
    tracker: ContextTracker,
}

impl ContextEngine {
    pub fn new(db: Database, catalog: Arc<ContextCatalog>, tracker: ContextTracker) -> Self {
        Self::with_config(db, catalog, tracker, ClassifierConfig::default())
    }

    pub fn with_config(
        db: Database,
        catalog: Arc<ContextCatalog>,
        tracker: ContextTracker,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            db,
            catalog,
            config,
            keywords: Arc::new(RwLock::new(None)),
            tracker,
        }
    }

    pub fn catalog(&self) -> &ContextCatalog {
        &self.catalog
    }

    pub fn tracker(&self) -> &ContextTracker {
        &self.tracker
    }

    /// Keyword weights in effect: the saved table if there is one, else the
    /// catalog defaults. Cached until `save_keywords` replaces it.
    pub async fn keywords(&self) -> Result<Arc<KeywordTable>> {
        if let Some(cached) = self.keywords.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let loaded = match self.db.get_context_keywords().await? {
            Some(saved) if !saved.is_empty() => saved,
            _ => self.catalog.keyword_table(),
        };
        let loaded = Arc::new(loaded);
        *self.keywords.write().await = Some(loaded.clone());
        Ok(loaded)
    }

    pub async fn save_keywords(&self, keywords: KeywordTable) -> Result<()> {
        self.db.save_context_keywords(&keywords).await?;
        *self.keywords.write().await = Some(Arc::new(keywords));
        Ok(())
    }

    pub async fn classify(&self, signal: &PageSignal) -> ContextResult {
        let result = match self.keywords().await {
            Ok(keywords) => score_page(&self.catalog, &keywords, &self.config, signal),
            Err(err) => {
                log_warn!("Falling back to General for {}: {err:#}", signal.url);
                ContextResult::general()
            }
        };

        if let Err(err) = self
            .tracker
            .add_context(&result.primary_context, &signal.url, result.confidence)
            .await
        {
            log_error!("Failed to record history for {}: {err:#}", signal.url);
        }

        log_info!(
            "Classified {} as {} ({:.2})",
            signal.url,
            result.primary_context,
            result.confidence
        );
        result
    }
}
