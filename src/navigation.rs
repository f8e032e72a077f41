//! Pre-navigation fast path and handling of classified tabs.
//!
//! The tab→context cache lives here and only here. It is a convenience for
//! callers that want the last context of a tab; blocking decisions always
//! re-read the store.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::classifier::{signals::extract_domain, ContextCatalog};
use crate::db::{models::SecondaryContext, Database};
use crate::focus::browser::{is_internal_url, BrowserSurface};
use crate::overrides::{resolve_context, ContextSource, ResolvedContext};
use crate::settings::SettingsStore;
use crate::{log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;

const TOP_FRAME: i64 = 0;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub tab_id: i64,
    pub url: String,
    #[serde(default)]
    pub frame_id: i64,
    /// `None` is treated as an active document.
    #[serde(default)]
    pub document_lifecycle: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    #[serde(default)]
    pub tab_id: Option<i64>,
    pub url: String,
    pub context: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub secondary_contexts: Vec<SecondaryContext>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDecision {
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl NavigationDecision {
    fn pass(context: Option<String>) -> Self {
        Self {
            blocked: false,
            context,
            redirect_url: None,
        }
    }
}

/// `<blocked page>?context=…&url=…`
pub fn blocked_page_url(base: &str, context: &str, url: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("context", context)
        .append_pair("url", url)
        .finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

#[derive(Clone)]
pub struct NavigationCoordinator {
    db: Database,
    catalog: Arc<ContextCatalog>,
    browser: Arc<dyn BrowserSurface>,
    settings: Arc<SettingsStore>,
    tab_contexts: Arc<Mutex<HashMap<i64, String>>>,
}

impl NavigationCoordinator {
    pub fn new(
        db: Database,
        catalog: Arc<ContextCatalog>,
        browser: Arc<dyn BrowserSurface>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            db,
            catalog,
            browser,
            settings,
            tab_contexts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn is_own_page(&self, url: &str) -> bool {
        let settings = self.settings.get();
        is_internal_url(url)
            || url.starts_with(&settings.blocked_page_url)
            || url.starts_with(&settings.focus_page_url)
    }

    /// Overrides only; classifier output is not available this early.
    async fn resolve_overrides(&self, url: &str) -> Result<Option<ResolvedContext>> {
        let domain = extract_domain(url);
        let overrides = self.db.get_url_pattern_overrides().await.unwrap_or_else(|err| {
            log_warn!("Could not read URL pattern overrides: {err:#}");
            Vec::new()
        });
        let domain_map = self.db.get_domain_context_map().await?;
        Ok(resolve_context(url, &domain, &overrides, &domain_map, None))
    }

    /// Redirects a top-level navigation whose known context is blocked by
    /// the active session. Unknown pages pass and are left to the rules.
    pub async fn before_navigate(&self, event: &NavigationEvent) -> Result<NavigationDecision> {
        if event.frame_id != TOP_FRAME {
            return Ok(NavigationDecision::default());
        }
        if event
            .document_lifecycle
            .as_deref()
            .is_some_and(|lifecycle| lifecycle != "active")
        {
            return Ok(NavigationDecision::default());
        }
        if self.is_own_page(&event.url) {
            return Ok(NavigationDecision::default());
        }

        let focus = self.db.get_focus_state().await?;
        if !focus.active {
            return Ok(NavigationDecision::default());
        }

        let Some(resolved) = self.resolve_overrides(&event.url).await? else {
            return Ok(NavigationDecision::default());
        };
        if !focus.is_blocked(&resolved.context) {
            return Ok(NavigationDecision::pass(Some(resolved.context)));
        }

        let redirect = self.redirect_to_blocked(event.tab_id, &resolved.context, &event.url).await;
        Ok(NavigationDecision {
            blocked: true,
            context: Some(resolved.context),
            redirect_url: Some(redirect),
        })
    }

    /// Caches the tab's context, groups the tab when auto-grouping is on,
    /// and redirects it when the effective context is blocked. Overrides
    /// take precedence over the reported context.
    pub async fn handle_context_update(&self, update: &ContextUpdate) -> Result<NavigationDecision> {
        let Some(tab_id) = update.tab_id else {
            return Ok(NavigationDecision::default());
        };
        self.tab_contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tab_id, update.context.clone());

        let effective = match self.resolve_overrides(&update.url).await {
            Ok(Some(resolved)) => resolved,
            Ok(None) => ResolvedContext {
                context: update.context.clone(),
                source: ContextSource::Classifier,
            },
            Err(err) => {
                log_error!("Could not resolve overrides for {}: {err:#}", update.url);
                ResolvedContext {
                    context: update.context.clone(),
                    source: ContextSource::Classifier,
                }
            }
        };
        if effective.source != ContextSource::Classifier {
            log_info!(
                "Context for {} overridden: {} -> {}",
                update.url,
                update.context,
                effective.context
            );
        }

        if self.settings.get().auto_group_enabled {
            let color = self.catalog.color_for(&effective.context);
            if let Err(err) = self
                .browser
                .group_tabs(&[tab_id], &effective.context, color)
                .await
            {
                log_warn!("Could not group tab {tab_id}: {err:#}");
            }
        }

        let focus = self.db.get_focus_state().await?;
        if !focus.is_blocked(&effective.context) {
            return Ok(NavigationDecision::pass(Some(effective.context)));
        }

        let redirect = self.redirect_to_blocked(tab_id, &effective.context, &update.url).await;
        Ok(NavigationDecision {
            blocked: true,
            context: Some(effective.context),
            redirect_url: Some(redirect),
        })
    }

    async fn redirect_to_blocked(&self, tab_id: i64, context: &str, url: &str) -> String {
        let redirect = blocked_page_url(&self.settings.get().blocked_page_url, context, url);
        match self.browser.navigate_tab(tab_id, &redirect).await {
            Ok(()) => log_info!("Blocked {url} ({context}) in tab {tab_id}"),
            Err(err) => log_error!("Could not redirect tab {tab_id}: {err:#}"),
        }
        redirect
    }

    pub fn cached_context(&self, tab_id: i64) -> Option<String> {
        self.tab_contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tab_id)
            .cloned()
    }

    pub async fn tab_removed(&self, tab_id: i64) {
        self.tab_contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tab_id);
        self.browser.observe_tab_removed(tab_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use crate::db::models::{MatchType, UrlPatternOverride};
    use crate::events::EventEmitter;
    use crate::focus::{FocusState, HostBrowser, TabInfo};

    struct Harness {
        db: Database,
        browser: Arc<HostBrowser>,
        navigation: NavigationCoordinator,
        _dir: tempfile::TempDir,
    }

    async fn harness(allowed: &[&str]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let browser = Arc::new(HostBrowser::new(EventEmitter::disabled()));
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        let navigation = NavigationCoordinator::new(
            db.clone(),
            Arc::new(ContextCatalog::default()),
            browser.clone(),
            settings,
        );
        let allowed = allowed.iter().map(|label| label.to_string()).collect();
        db.save_focus_state(&FocusState::started(allowed, None, Utc::now()))
            .await
            .unwrap();
        browser
            .record_tab(TabInfo {
                tab_id: 7,
                url: "about:blank".into(),
                ..TabInfo::default()
            })
            .await;
        Harness {
            db,
            browser,
            navigation,
            _dir: dir,
        }
    }

    fn navigation(url: &str) -> NavigationEvent {
        NavigationEvent {
            tab_id: 7,
            url: url.into(),
            frame_id: 0,
            document_lifecycle: None,
        }
    }

    #[test]
    fn blocked_url_carries_encoded_context_and_target() {
        assert_eq!(
            blocked_page_url("focuslens://blocked.html", "News", "https://bbc.com/a?b=c"),
            "focuslens://blocked.html?context=News&url=https%3A%2F%2Fbbc.com%2Fa%3Fb%3Dc"
        );
    }

    #[tokio::test]
    async fn blocked_domain_is_redirected_before_load() {
        let h = harness(&["Work"]).await;
        h.db.set_domain_context("bbc.com", "News").await.unwrap();

        let decision = h
            .navigation
            .before_navigate(&navigation("https://bbc.com/news"))
            .await
            .unwrap();
        assert!(decision.blocked);
        assert_eq!(decision.context.as_deref(), Some("News"));
        let tab = h.browser.tab(7).await.unwrap();
        assert!(tab.url.starts_with("focuslens://blocked.html?context=News"));
    }

    #[tokio::test]
    async fn mixed_case_domain_entry_still_blocks() {
        let h = harness(&["Work"]).await;
        h.db.set_domain_context("BBC.com", "News").await.unwrap();

        let decision = h
            .navigation
            .before_navigate(&navigation("https://bbc.com/"))
            .await
            .unwrap();
        assert!(decision.blocked);
        assert_eq!(decision.context.as_deref(), Some("News"));
    }

    #[tokio::test]
    async fn url_pattern_wins_over_domain_map() {
        let h = harness(&["Work"]).await;
        h.db.set_domain_context("bbc.com", "News").await.unwrap();
        h.db.add_url_pattern_override(UrlPatternOverride {
            pattern: "https://bbc.com/worklife".into(),
            context: "Work".into(),
            priority: 100,
            match_type: MatchType::StartsWith,
            created_at: Utc::now(),
            description: None,
        })
        .await
        .unwrap();

        let decision = h
            .navigation
            .before_navigate(&navigation("https://bbc.com/worklife/story"))
            .await
            .unwrap();
        assert_eq!(decision, NavigationDecision::pass(Some("Work".into())));
    }

    #[tokio::test]
    async fn subframes_and_inactive_sessions_pass() {
        let h = harness(&["Work"]).await;
        h.db.set_domain_context("bbc.com", "News").await.unwrap();

        let mut frame = navigation("https://bbc.com/");
        frame.frame_id = 3;
        assert!(!h.navigation.before_navigate(&frame).await.unwrap().blocked);

        h.db.save_focus_state(&FocusState::default()).await.unwrap();
        assert!(!h
            .navigation
            .before_navigate(&navigation("https://bbc.com/"))
            .await
            .unwrap()
            .blocked);
    }

    #[tokio::test]
    async fn context_update_groups_caches_and_blocks() {
        let h = harness(&["Work"]).await;
        let decision = h
            .navigation
            .handle_context_update(&ContextUpdate {
                tab_id: Some(7),
                url: "https://example.org/video".into(),
                context: "Entertainment".into(),
                confidence: 0.8,
                secondary_contexts: Vec::new(),
            })
            .await
            .unwrap();

        assert!(decision.blocked);
        assert_eq!(h.navigation.cached_context(7).as_deref(), Some("Entertainment"));
        let tab = h.browser.tab(7).await.unwrap();
        assert_eq!(tab.group_title.as_deref(), Some("Entertainment"));

        h.navigation.tab_removed(7).await;
        assert!(h.navigation.cached_context(7).is_none());
        assert!(h.browser.tab(7).await.is_none());
    }
}
