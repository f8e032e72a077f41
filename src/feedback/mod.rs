//! User corrections: every submission is logged, and unless scoped away it
//! retrains the domain map or adds a URL-pattern override. Rules are
//! recompiled before a submission reports success.

mod pattern;
mod statistics;

pub use pattern::synthesize_pattern;
pub use statistics::feedback_statistics;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::classifier::signals::extract_domain;
use crate::db::models::{ClassificationFeedback, FeedbackStatistics, UrlPatternOverride};
use crate::db::Database;
use crate::overrides::is_multi_purpose_domain;
use crate::rules::BlockingRules;
use crate::{log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;

pub const FEEDBACK_OVERRIDE_PRIORITY: i64 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideType {
    Domain,
    UrlPattern,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub url: String,
    pub predicted_context: String,
    pub corrected_context: String,
    pub source: String,
    #[serde(default)]
    pub override_type: Option<OverrideType>,
}

/// A correction that has already been scoped by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub url: String,
    pub domain: String,
    pub predicted_context: String,
    pub corrected_context: String,
    pub source: String,
    #[serde(default)]
    pub skip_domain_override: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_multi_purpose_domain: Option<bool>,
}

fn is_extension_domain(domain: &str) -> bool {
    domain.is_empty() || domain.starts_with("chrome-extension")
}

#[derive(Clone)]
pub struct FeedbackLoop {
    db: Database,
    rules: BlockingRules,
}

impl FeedbackLoop {
    pub fn new(db: Database, rules: BlockingRules) -> Self {
        Self { db, rules }
    }

    /// Multi-purpose domains submitted without a scope are only logged and
    /// the outcome flags them so the caller can ask for one.
    pub async fn submit_feedback(&self, request: FeedbackRequest) -> Result<FeedbackOutcome> {
        let domain = extract_domain(&request.url);
        let multi_purpose = is_multi_purpose_domain(&domain);

        let mut pattern_error = None;
        let skip_domain_override = match request.override_type {
            None if multi_purpose => true,
            Some(OverrideType::UrlPattern) => {
                if let Err(err) = self
                    .add_pattern_override(&request.url, &request.corrected_context)
                    .await
                {
                    log_error!("Failed to save URL-pattern override: {err:#}");
                    pattern_error = Some(err);
                }
                true
            }
            _ => false,
        };

        self.record_feedback(FeedbackEvent {
            url: request.url,
            domain,
            predicted_context: request.predicted_context,
            corrected_context: request.corrected_context,
            source: request.source,
            skip_domain_override,
        })
        .await?;

        // The correction is logged either way; the caller still learns the
        // override was lost.
        if let Some(err) = pattern_error {
            return Err(err.context("feedback recorded without its URL-pattern override"));
        }

        Ok(FeedbackOutcome {
            success: true,
            is_multi_purpose_domain: Some(multi_purpose),
        })
    }

    async fn add_pattern_override(&self, url: &str, context: &str) -> Result<()> {
        let (pattern, match_type) = match synthesize_pattern(url) {
            Ok(synthesized) => synthesized,
            Err(err) => {
                log_warn!("Skipping URL-pattern override: {err:#}");
                return Ok(());
            }
        };
        let entry = UrlPatternOverride {
            description: Some(format!("Override for {pattern} (from feedback)")),
            pattern,
            context: context.to_string(),
            priority: FEEDBACK_OVERRIDE_PRIORITY,
            match_type,
            created_at: Utc::now(),
        };
        log_info!("Adding URL-pattern override {} -> {}", entry.pattern, entry.context);
        self.db.add_url_pattern_override(entry).await
    }

    /// Writes the domain map (when allowed) and the audit log, then waits
    /// for the rule set to be reinstalled.
    pub async fn record_feedback(&self, event: FeedbackEvent) -> Result<()> {
        let writes_domain = !event.skip_domain_override
            && !is_extension_domain(&event.domain)
            && !is_multi_purpose_domain(&event.domain);

        if writes_domain {
            self.db
                .set_domain_context(&event.domain, &event.corrected_context)
                .await?;
            log_info!(
                "Domain {} now maps to {}",
                event.domain,
                event.corrected_context
            );
        } else {
            log_info!("Leaving domain map untouched for {}", event.domain);
        }

        self.db
            .append_feedback(ClassificationFeedback {
                url: event.url,
                domain: event.domain,
                timestamp: Utc::now(),
                predicted_context: event.predicted_context,
                corrected_context: event.corrected_context,
                source: event.source,
            })
            .await?;

        self.rules.apply_allowed_contexts().await?;
        Ok(())
    }

    pub async fn statistics(&self) -> Result<FeedbackStatistics> {
        Ok(feedback_statistics(&self.db.get_feedback_log().await?))
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.db.clear_feedback_log().await?;
        log_info!("Feedback history cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::classifier::ContextCatalog;
    use crate::db::models::MatchType;
    use crate::events::EventEmitter;
    use crate::focus::FocusState;
    use crate::rules::{LocalRuleEngine, RuleAction};
    use crate::settings::SettingsStore;

    struct Harness {
        db: Database,
        engine: Arc<LocalRuleEngine>,
        feedback: FeedbackLoop,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let engine = Arc::new(LocalRuleEngine::new(EventEmitter::disabled()));
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        let rules = BlockingRules::new(
            db.clone(),
            Arc::new(ContextCatalog::default()),
            engine.clone(),
            settings,
        );
        Harness {
            feedback: FeedbackLoop::new(db.clone(), rules),
            db,
            engine,
            _dir: dir,
        }
    }

    fn request(url: &str, corrected: &str, override_type: Option<OverrideType>) -> FeedbackRequest {
        FeedbackRequest {
            url: url.into(),
            predicted_context: "Work".into(),
            corrected_context: corrected.into(),
            source: "popup".into(),
            override_type,
        }
    }

    #[tokio::test]
    async fn multi_purpose_domain_without_scope_only_logs() {
        let h = harness();
        let outcome = h
            .feedback
            .submit_feedback(request("https://docs.google.com/document/d/1", "Research", None))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FeedbackOutcome {
                success: true,
                is_multi_purpose_domain: Some(true)
            }
        );
        assert!(h.db.get_domain_context_map().await.unwrap().is_empty());
        assert!(h.db.get_url_pattern_overrides().await.unwrap().is_empty());
        assert_eq!(h.db.get_feedback_log().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn domain_feedback_retrains_map_and_rules() {
        let h = harness();
        h.db.save_focus_state(&FocusState::started(vec!["Work".into()], None, Utc::now()))
            .await
            .unwrap();

        h.feedback
            .submit_feedback(request("https://bbc.com/news/1", "News", None))
            .await
            .unwrap();

        let map = h.db.get_domain_context_map().await.unwrap();
        assert_eq!(map.get("bbc.com").map(String::as_str), Some("News"));

        let installed = h.engine.installed_rules().await;
        assert!(installed
            .iter()
            .any(|rule| matches!(rule.action, RuleAction::Redirect { .. })));
    }

    #[tokio::test]
    async fn url_pattern_feedback_skips_domain_map() {
        let h = harness();
        h.feedback
            .submit_feedback(request(
                "https://www.youtube.com/watch?v=lecture",
                "Research",
                Some(OverrideType::UrlPattern),
            ))
            .await
            .unwrap();

        assert!(h.db.get_domain_context_map().await.unwrap().is_empty());
        let overrides = h.db.get_url_pattern_overrides().await.unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].pattern, "https://www.youtube.com/watch");
        assert_eq!(overrides[0].priority, FEEDBACK_OVERRIDE_PRIORITY);
        assert_eq!(overrides[0].match_type, MatchType::Exact);
    }

    #[tokio::test]
    async fn explicit_domain_scope_still_guards_multi_purpose() {
        let h = harness();
        let outcome = h
            .feedback
            .submit_feedback(request(
                "https://www.reddit.com/r/rust",
                "Development",
                Some(OverrideType::Domain),
            ))
            .await
            .unwrap();
        assert_eq!(outcome.is_multi_purpose_domain, Some(true));
        assert!(h.db.get_domain_context_map().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn statistics_and_clear() {
        let h = harness();
        h.feedback
            .submit_feedback(request("https://bbc.com/a", "News", None))
            .await
            .unwrap();
        h.feedback
            .submit_feedback(request("https://bbc.com/b", "News", None))
            .await
            .unwrap();

        let stats = h.feedback.statistics().await.unwrap();
        assert_eq!(stats.total_feedback, 2);
        assert_eq!(stats.most_common_corrections[0].count, 2);

        h.feedback.clear_history().await.unwrap();
        assert_eq!(h.feedback.statistics().await.unwrap().total_feedback, 0);
    }

    #[tokio::test]
    async fn failed_pattern_write_still_logs_feedback() {
        let h = harness();
        h.db.execute(|conn| {
            conn.execute_batch(&format!(
                "CREATE TRIGGER reject_overrides BEFORE INSERT ON kv_store
                 WHEN NEW.key = '{key}'
                 BEGIN SELECT RAISE(ABORT, 'overrides are read-only'); END;",
                key = crate::db::keys::URL_PATTERN_OVERRIDES
            ))?;
            Ok(())
        })
        .await
        .unwrap();

        let result = h
            .feedback
            .submit_feedback(request(
                "https://bbc.com/worklife/1",
                "Work",
                Some(OverrideType::UrlPattern),
            ))
            .await;
        assert!(result.is_err());

        let log = h.db.get_feedback_log().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].corrected_context, "Work");
        assert!(h.db.get_url_pattern_overrides().await.unwrap().is_empty());
        // Scoped to a pattern, so the domain map is left alone.
        assert!(h.db.get_domain_context_map().await.unwrap().is_empty());
    }
}
