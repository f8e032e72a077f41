use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use super::compiler::{compile_rules, CompileInput, CompiledRules};
use super::model::Rule;
use crate::classifier::ContextCatalog;
use crate::db::Database;
use crate::events::EventEmitter;
use crate::settings::SettingsStore;
use crate::{log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// The declarative blocking engine. Only full replacement is supported:
/// one call removes the given IDs and adds the given rules atomically.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    async fn dynamic_rule_ids(&self) -> Result<Vec<u32>>;

    async fn update_dynamic_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<Rule>)
        -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RulesUpdatedEvent<'a> {
    rule_count: usize,
    rules: &'a [Rule],
}

/// In-process rule engine. Holds the installed set and publishes every
/// replacement so the host can mirror it.
pub struct LocalRuleEngine {
    installed: Mutex<Vec<Rule>>,
    events: EventEmitter,
}

impl LocalRuleEngine {
    pub fn new(events: EventEmitter) -> Self {
        Self {
            installed: Mutex::new(Vec::new()),
            events,
        }
    }

    pub async fn installed_rules(&self) -> Vec<Rule> {
        self.installed.lock().await.clone()
    }
}

#[async_trait]
impl RuleEngine for LocalRuleEngine {
    async fn dynamic_rule_ids(&self) -> Result<Vec<u32>> {
        Ok(self.installed.lock().await.iter().map(|rule| rule.id).collect())
    }

    async fn update_dynamic_rules(
        &self,
        remove_rule_ids: Vec<u32>,
        add_rules: Vec<Rule>,
    ) -> Result<()> {
        let mut installed = self.installed.lock().await;
        let removed: HashSet<u32> = remove_rule_ids.into_iter().collect();

        let mut next: Vec<Rule> = installed
            .iter()
            .filter(|rule| !removed.contains(&rule.id))
            .cloned()
            .collect();
        let mut ids: HashSet<u32> = next.iter().map(|rule| rule.id).collect();
        for rule in &add_rules {
            if !ids.insert(rule.id) {
                bail!("duplicate rule id {}", rule.id);
            }
        }
        next.extend(add_rules);

        *installed = next;
        self.events.emit(
            "dynamic-rules-updated",
            RulesUpdatedEvent {
                rule_count: installed.len(),
                rules: &installed,
            },
        )?;
        Ok(())
    }
}

/// Recompiles and installs the rule set from whatever is persisted now.
#[derive(Clone)]
pub struct BlockingRules {
    db: Database,
    catalog: Arc<ContextCatalog>,
    engine: Arc<dyn RuleEngine>,
    settings: Arc<SettingsStore>,
    apply_lock: Arc<Mutex<()>>,
}

impl BlockingRules {
    pub fn new(
        db: Database,
        catalog: Arc<ContextCatalog>,
        engine: Arc<dyn RuleEngine>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            db,
            catalog,
            engine,
            settings,
            apply_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Applies are serialized so two recompilations never interleave their
    /// read of current IDs with each other's replacement.
    pub async fn apply_allowed_contexts(&self) -> Result<CompiledRules> {
        let _guard = self.apply_lock.lock().await;

        let focus = self.db.get_focus_state().await?;
        let settings = self.settings.get();

        let compiled = if focus.active {
            let overrides = self.db.get_url_pattern_overrides().await.unwrap_or_else(|err| {
                log_warn!("Could not read URL pattern overrides: {err:#}");
                Vec::new()
            });
            let domain_map = match self.db.find_domain_context_map().await {
                Ok(map) => map,
                Err(err) => {
                    log_error!("Could not read domain map: {err:#}");
                    None
                }
            };
            let path_overrides = self.db.get_path_overrides().await.unwrap_or_else(|err| {
                log_warn!("Could not read legacy path overrides: {err:#}");
                Vec::new()
            });
            let labels = self.catalog.labels();

            compile_rules(&CompileInput {
                focus: &focus,
                overrides: &overrides,
                domain_map: domain_map.as_ref(),
                path_overrides: &path_overrides,
                known_contexts: &labels,
                blocked_page_url: &settings.blocked_page_url,
                max_rules: settings.max_rules,
            })
        } else {
            CompiledRules::default()
        };

        let current_ids = self.engine.dynamic_rule_ids().await?;
        self.engine
            .update_dynamic_rules(current_ids, compiled.rules.clone())
            .await?;

        log_info!(
            "Applied {} rules for {} blocked contexts",
            compiled.rules.len(),
            compiled.blocked_contexts.len()
        );
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusState;
    use crate::rules::model::{RuleAction, RuleCondition};
    use chrono::Utc;

    fn rule(id: u32) -> Rule {
        Rule {
            id,
            priority: 1,
            action: RuleAction::Allow,
            condition: RuleCondition::default(),
        }
    }

    #[tokio::test]
    async fn replacement_swaps_whole_set() {
        let engine = LocalRuleEngine::new(EventEmitter::disabled());
        engine.update_dynamic_rules(vec![], vec![rule(1), rule(2)]).await.unwrap();
        engine.update_dynamic_rules(vec![1, 2], vec![rule(3)]).await.unwrap();
        assert_eq!(engine.dynamic_rule_ids().await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn duplicate_ids_leave_installed_set_untouched() {
        let engine = LocalRuleEngine::new(EventEmitter::disabled());
        engine.update_dynamic_rules(vec![], vec![rule(1)]).await.unwrap();
        assert!(engine.update_dynamic_rules(vec![], vec![rule(1)]).await.is_err());
        assert_eq!(engine.dynamic_rule_ids().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn apply_follows_focus_state() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let engine = Arc::new(LocalRuleEngine::new(EventEmitter::disabled()));
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        let blocking = BlockingRules::new(
            db.clone(),
            Arc::new(ContextCatalog::default()),
            engine.clone(),
            settings,
        );

        db.set_domain_context("bbc.com", "News").await.unwrap();
        db.save_focus_state(&FocusState::started(vec!["Work".into()], None, Utc::now()))
            .await
            .unwrap();
        let compiled = blocking.apply_allowed_contexts().await.unwrap();
        assert_eq!(compiled.rules.len(), 1);
        assert_eq!(engine.installed_rules().await, compiled.rules);

        db.save_focus_state(&FocusState::default()).await.unwrap();
        blocking.apply_allowed_contexts().await.unwrap();
        assert!(engine.installed_rules().await.is_empty());
    }
}
