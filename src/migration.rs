//! One-shot startup pass: seed and clean the domain map, carry legacy keys
//! forward, settle sessions that expired while nothing was running, and
//! install the rule set that matches the result.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use crate::classifier::ContextCatalog;
use crate::classifier::catalog::WORK;
use crate::db::models::{DomainContextMap, MatchType, UrlPatternOverride};
use crate::db::{keys, Database};
use crate::focus::FocusState;
use crate::rules::BlockingRules;
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

pub const MIGRATED_OVERRIDE_PRIORITY: i64 = 100;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartupReport {
    pub seeded_domains: usize,
    pub stripped_domains: usize,
    pub migrated_session: bool,
    pub migrated_path_overrides: usize,
    pub ended_expired_session: bool,
}

pub async fn seed_domain_map(db: &Database, catalog: &ContextCatalog) -> Result<usize> {
    if db.find_domain_context_map().await?.is_some() {
        return Ok(0);
    }
    let seeded: DomainContextMap = catalog
        .domain_entries()
        .map(|(domain, context)| (domain.to_string(), context.to_string()))
        .collect();
    db.save_domain_context_map(&seeded).await?;
    let written = db.get_domain_context_map().await?.len();
    log_info!("Seeded domain map with {written} catalog domains");
    Ok(written)
}

/// `focusSessionActive`/`focusSessionEndTime`/`blockedCategories` become a
/// `focusState`, unless one already exists.
pub async fn migrate_legacy_session(db: &Database, catalog: &ContextCatalog) -> Result<bool> {
    if db.contains_key(keys::FOCUS_STATE).await? {
        return Ok(false);
    }
    let legacy = db.get_legacy_session().await?;
    if legacy.active != Some(true) && legacy.blocked_categories.is_none() {
        return Ok(false);
    }

    let blocked = legacy.blocked_categories.unwrap_or_default();
    let state = FocusState {
        active: legacy.active == Some(true),
        allowed_contexts: Some(catalog.allowed_excluding(&blocked)),
        end_time: legacy.end_time,
        session_id: None,
    };
    db.save_focus_state(&state).await?;
    db.clear_legacy_session().await?;
    log_info!(
        "Migrated legacy session (active: {}, allowed: {:?})",
        state.active,
        state.allowed_contexts
    );
    Ok(true)
}

pub async fn migrate_path_overrides(db: &Database) -> Result<usize> {
    let paths = db.get_path_overrides().await?;
    if paths.is_empty() {
        return Ok(0);
    }
    for path in &paths {
        db.add_url_pattern_override(UrlPatternOverride {
            pattern: path.clone(),
            context: WORK.to_string(),
            priority: MIGRATED_OVERRIDE_PRIORITY,
            match_type: MatchType::StartsWith,
            created_at: Utc::now(),
            description: Some(format!("Migrated from legacy path override: {path}")),
        })
        .await?;
    }
    db.clear_path_overrides().await?;
    log_info!("Migrated {} legacy path overrides", paths.len());
    Ok(paths.len())
}

/// Marks an elapsed session inactive without touching tabs.
pub async fn end_expired_session(db: &Database) -> Result<bool> {
    let state = db.get_focus_state().await?;
    if !state.is_expired(Utc::now()) {
        return Ok(false);
    }
    db.save_focus_state(&state.ended()).await?;
    log_info!("Focus session expired while stopped; marked inactive");
    Ok(true)
}

pub async fn run_startup(
    db: &Database,
    catalog: &ContextCatalog,
    rules: &BlockingRules,
) -> Result<StartupReport> {
    let report = StartupReport {
        seeded_domains: seed_domain_map(db, catalog).await?,
        stripped_domains: db.strip_multi_purpose_domains().await?,
        migrated_session: migrate_legacy_session(db, catalog).await?,
        migrated_path_overrides: migrate_path_overrides(db).await?,
        ended_expired_session: end_expired_session(db).await?,
    };

    if let Err(err) = rules.apply_allowed_contexts().await {
        log_error!("Initial rule installation failed: {err:#}");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use pretty_assertions::assert_eq;

    use crate::events::EventEmitter;
    use crate::rules::LocalRuleEngine;
    use crate::settings::SettingsStore;

    #[tokio::test]
    async fn seeding_only_happens_once_and_skips_multi_purpose() {
        let db = Database::in_memory().unwrap();
        let catalog = ContextCatalog::default();

        let seeded = seed_domain_map(&db, &catalog).await.unwrap();
        assert!(seeded > 0);
        let map = db.get_domain_context_map().await.unwrap();
        assert!(!map.contains_key("github.com"));
        assert!(!map.contains_key("youtube.com"));

        db.remove_domain_context(map.keys().next().unwrap()).await.unwrap();
        assert_eq!(seed_domain_map(&db, &catalog).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn legacy_session_becomes_focus_state() {
        let db = Database::in_memory().unwrap();
        let end = Utc::now() + Duration::minutes(20);
        db.set_value(keys::LEGACY_SESSION_ACTIVE, &true).await.unwrap();
        db.set_value(keys::LEGACY_SESSION_END_TIME, &end.timestamp_millis())
            .await
            .unwrap();
        db.set_value(keys::LEGACY_BLOCKED_CATEGORIES, &vec!["Social", "Shopping"])
            .await
            .unwrap();

        assert!(migrate_legacy_session(&db, &ContextCatalog::default()).await.unwrap());

        let state = db.get_focus_state().await.unwrap();
        assert!(state.active);
        assert!(state.is_blocked("Social"));
        assert!(!state.is_blocked("Work"));
        assert_eq!(
            state.end_time.map(|t| t.timestamp_millis()),
            Some(end.timestamp_millis())
        );
        assert!(db.get_legacy_session().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_focus_state_is_not_overwritten() {
        let db = Database::in_memory().unwrap();
        db.save_focus_state(&FocusState::default()).await.unwrap();
        db.set_value(keys::LEGACY_SESSION_ACTIVE, &true).await.unwrap();
        assert!(!migrate_legacy_session(&db, &ContextCatalog::default()).await.unwrap());
        assert!(!db.get_focus_state().await.unwrap().active);
    }

    #[tokio::test]
    async fn path_overrides_become_prefix_overrides() {
        let db = Database::in_memory().unwrap();
        db.set_value(keys::PATH_OVERRIDES, &vec!["https://intranet.local/wiki"])
            .await
            .unwrap();

        assert_eq!(migrate_path_overrides(&db).await.unwrap(), 1);
        let overrides = db.get_url_pattern_overrides().await.unwrap();
        assert_eq!(overrides[0].match_type, MatchType::StartsWith);
        assert_eq!(overrides[0].context, WORK);
        assert_eq!(overrides[0].priority, MIGRATED_OVERRIDE_PRIORITY);
        assert!(db.get_path_overrides().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn startup_ends_expired_session_and_clears_rules() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let catalog = Arc::new(ContextCatalog::default());
        let engine = Arc::new(LocalRuleEngine::new(EventEmitter::disabled()));
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        let rules = BlockingRules::new(db.clone(), catalog.clone(), engine.clone(), settings);

        let mut state = FocusState::started(vec![WORK.into()], Some(5), Utc::now());
        state.end_time = Some(Utc::now() - Duration::minutes(1));
        db.save_focus_state(&state).await.unwrap();

        let report = run_startup(&db, &catalog, &rules).await.unwrap();
        assert!(report.ended_expired_session);
        assert!(report.seeded_domains > 0);
        assert!(!db.get_focus_state().await.unwrap().active);
        assert!(engine.installed_rules().await.is_empty());
    }
}
