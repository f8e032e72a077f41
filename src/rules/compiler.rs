//! Turns the focus policy and the stored overrides into one ordered rule
//! set.
//!
//! Rules are built band by band, highest priority first: allow rules for
//! overrides in an allowed context, redirect rules for overrides in a
//! blocked context (plus bare legacy paths), then one redirect rule per
//! blocked context over that context's domains. The ceiling truncates the
//! tail of that order and never reorders what was already added.

use std::collections::{BTreeMap, HashSet};

use log::warn;

use super::model::{DomainType, ResourceType, Rule, RuleAction, RuleCondition};
use crate::db::models::{DomainContextMap, MatchType, UrlPatternOverride};
use crate::focus::FocusState;
use crate::overrides::is_multi_purpose_domain;
use crate::overrides::resolver::strip_scheme;

pub const RULE_ID_OFFSET: u32 = 100;
pub const DEFAULT_MAX_RULES: usize = 5000;

pub const PRIORITY_ALLOW: u32 = 1000;
pub const PRIORITY_PATTERN_BLOCK: u32 = 2;
pub const PRIORITY_DOMAIN_BLOCK: u32 = 1;

const EXCLUDED_INITIATORS: [&str; 2] = ["localhost", "chrome-extension"];

pub struct CompileInput<'a> {
    pub focus: &'a FocusState,
    pub overrides: &'a [UrlPatternOverride],
    /// `None` when the map could not be read; domain rules are then skipped.
    pub domain_map: Option<&'a DomainContextMap>,
    pub path_overrides: &'a [String],
    /// Every label the compiler may block, in catalog order.
    pub known_contexts: &'a [&'a str],
    pub blocked_page_url: &'a str,
    pub max_rules: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledRules {
    pub rules: Vec<Rule>,
    pub blocked_contexts: Vec<String>,
    pub skipped: usize,
    pub truncated: bool,
}

impl CompiledRules {
    pub fn allow_count(&self) -> usize {
        self.rules.iter().filter(|rule| rule.is_allow()).count()
    }
}

struct RuleSet {
    rules: Vec<Rule>,
    next_id: u32,
    max_rules: usize,
    truncated: bool,
    skipped: usize,
}

impl RuleSet {
    fn new(max_rules: usize) -> Self {
        Self {
            rules: Vec::new(),
            next_id: RULE_ID_OFFSET,
            max_rules,
            truncated: false,
            skipped: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.rules.len() >= self.max_rules
    }

    /// Returns `false` once the ceiling is hit; nothing more is accepted.
    fn push(&mut self, priority: u32, action: RuleAction, condition: RuleCondition) -> bool {
        if self.is_full() {
            if !self.truncated {
                warn!("Hit rule limit of {}; remaining rules dropped", self.max_rules);
                self.truncated = true;
            }
            return false;
        }
        self.rules.push(Rule {
            id: self.next_id,
            priority,
            action,
            condition,
        });
        self.next_id += 1;
        true
    }

    fn skip(&mut self, pattern: &str, reason: &str) {
        warn!("Skipping rule for '{pattern}': {reason}");
        self.skipped += 1;
    }
}

fn is_valid_filter_body(pattern: &str) -> bool {
    !pattern.is_empty() && pattern.is_ascii() && !pattern.chars().any(char::is_whitespace)
}

/// `|p|` anchors both ends. Prefix patterns match on any scheme, the way
/// the resolver compares them, so they drop the scheme and anchor on the
/// host with `||`.
pub fn url_filter_for(entry: &UrlPatternOverride) -> Option<String> {
    if !is_valid_filter_body(&entry.pattern) {
        return None;
    }
    match entry.match_type {
        MatchType::Exact => Some(format!("|{}|", entry.pattern)),
        MatchType::StartsWith => {
            let body = strip_scheme(&entry.pattern);
            (!body.is_empty()).then(|| format!("||{body}"))
        }
        MatchType::Unsupported => None,
    }
}

fn main_frame_filter(url_filter: String) -> RuleCondition {
    RuleCondition {
        url_filter: Some(url_filter),
        resource_types: vec![ResourceType::MainFrame],
        ..RuleCondition::default()
    }
}

/// Catalog labels first, then any other context the domain map uses.
fn blocked_contexts(input: &CompileInput<'_>, allowed: &[String]) -> Vec<String> {
    let is_allowed = |context: &str| allowed.iter().any(|label| label == context);

    let mut contexts: Vec<String> = input
        .known_contexts
        .iter()
        .filter(|context| !is_allowed(**context))
        .map(|context| context.to_string())
        .collect();

    if let Some(map) = input.domain_map {
        let mut extra: Vec<&String> = map
            .values()
            .filter(|context| !input.known_contexts.contains(&context.as_str()))
            .filter(|context| !is_allowed(context.as_str()))
            .collect();
        extra.sort();
        extra.dedup();
        contexts.extend(extra.into_iter().cloned());
    }

    contexts
}

pub fn compile_rules(input: &CompileInput<'_>) -> CompiledRules {
    if !input.focus.active {
        return CompiledRules::default();
    }
    let Some(allowed) = input.focus.allowed_contexts.as_deref() else {
        warn!("Allowed contexts are malformed; installing no rules");
        return CompiledRules::default();
    };
    let is_allowed = |context: &str| allowed.iter().any(|label| label == context);

    let mut set = RuleSet::new(input.max_rules);

    let mut allow_filters = HashSet::new();
    for entry in input.overrides.iter().filter(|entry| is_allowed(entry.context.as_str())) {
        let Some(filter) = url_filter_for(entry) else {
            set.skip(&entry.pattern, "no valid filter");
            continue;
        };
        if !allow_filters.insert(filter.clone()) {
            continue;
        }
        if !set.push(PRIORITY_ALLOW, RuleAction::Allow, main_frame_filter(filter)) {
            break;
        }
    }

    let redirect = RuleAction::redirect_to(input.blocked_page_url);

    let mut block_filters = HashSet::new();
    if !set.is_full() {
        for entry in input.overrides.iter().filter(|entry| !is_allowed(entry.context.as_str())) {
            let Some(filter) = url_filter_for(entry) else {
                set.skip(&entry.pattern, "no valid filter");
                continue;
            };
            if !block_filters.insert(filter.clone()) {
                continue;
            }
            if !set.push(PRIORITY_PATTERN_BLOCK, redirect.clone(), main_frame_filter(filter)) {
                break;
            }
        }
    }

    let blocked = blocked_contexts(input, allowed);

    match input.domain_map {
        Some(map) if !set.is_full() => {
            let mut by_context: BTreeMap<&str, Vec<String>> = BTreeMap::new();
            for (domain, context) in map {
                if is_multi_purpose_domain(domain) {
                    continue;
                }
                by_context
                    .entry(context.as_str())
                    .or_default()
                    .push(domain.to_ascii_lowercase());
            }

            for context in &blocked {
                let Some(domains) = by_context.get_mut(context.as_str()) else {
                    continue;
                };
                domains.sort();
                domains.dedup();
                let condition = RuleCondition {
                    request_domains: Some(domains.clone()),
                    resource_types: vec![ResourceType::MainFrame],
                    domain_type: Some(DomainType::FirstParty),
                    excluded_initiator_domains: Some(
                        EXCLUDED_INITIATORS.iter().map(|d| d.to_string()).collect(),
                    ),
                    ..RuleCondition::default()
                };
                if !set.push(PRIORITY_DOMAIN_BLOCK, redirect.clone(), condition) {
                    break;
                }
            }
        }
        Some(_) => {}
        None => warn!("No domain map available; skipping domain rules"),
    }

    if !set.is_full() {
        for path in input.path_overrides {
            if !is_valid_filter_body(path) {
                set.skip(path, "invalid legacy path");
                continue;
            }
            let filter = format!("|{path}|");
            if !block_filters.insert(filter.clone()) {
                continue;
            }
            if !set.push(PRIORITY_PATTERN_BLOCK, redirect.clone(), main_frame_filter(filter)) {
                break;
            }
        }
    }

    CompiledRules {
        rules: set.rules,
        blocked_contexts: blocked,
        skipped: set.skipped,
        truncated: set.truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::catalog::{ContextCatalog, ENTERTAINMENT, NEWS, SOCIAL, WORK};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    const BLOCKED: &str = "focuslens://blocked.html";

    fn focus(allowed: &[&str]) -> FocusState {
        FocusState::started(allowed.iter().map(|s| s.to_string()).collect(), None, Utc::now())
    }

    fn entry(pattern: &str, context: &str, match_type: MatchType) -> UrlPatternOverride {
        UrlPatternOverride {
            pattern: pattern.into(),
            context: context.into(),
            priority: 100,
            match_type,
            created_at: Utc::now(),
            description: None,
        }
    }

    fn compile(
        focus: &FocusState,
        overrides: &[UrlPatternOverride],
        map: Option<&DomainContextMap>,
        paths: &[String],
        max_rules: usize,
    ) -> CompiledRules {
        let catalog = ContextCatalog::default();
        let labels = catalog.labels();
        compile_rules(&CompileInput {
            focus,
            overrides,
            domain_map: map,
            path_overrides: paths,
            known_contexts: &labels,
            blocked_page_url: BLOCKED,
            max_rules,
        })
    }

    fn map(entries: &[(&str, &str)]) -> DomainContextMap {
        entries
            .iter()
            .map(|(domain, context)| (domain.to_string(), context.to_string()))
            .collect()
    }

    #[test]
    fn inactive_or_malformed_policy_compiles_nothing() {
        let domains = map(&[("bbc.com", NEWS)]);
        let inactive = FocusState::default();
        assert!(compile(&inactive, &[], Some(&domains), &[], 5000).rules.is_empty());

        let mut malformed = focus(&[WORK]);
        malformed.allowed_contexts = None;
        assert!(compile(&malformed, &[], Some(&domains), &[], 5000).rules.is_empty());
    }

    #[test]
    fn bands_are_built_in_priority_order_with_sequential_ids() {
        let overrides = vec![
            entry("https://bbc.com/worklife", WORK, MatchType::StartsWith),
            entry("https://notion.so/fun", ENTERTAINMENT, MatchType::Exact),
        ];
        let domains = map(&[("bbc.com", NEWS), ("netflix.com", ENTERTAINMENT)]);
        let paths = vec!["https://old.example/path".to_string()];

        let compiled = compile(&focus(&[WORK]), &overrides, Some(&domains), &paths, 5000);
        let summary: Vec<(u32, u32)> = compiled.rules.iter().map(|r| (r.id, r.priority)).collect();
        assert_eq!(
            summary,
            vec![(100, 1000), (101, 2), (102, 1), (103, 1), (104, 2)]
        );

        assert!(compiled.rules[0].is_allow());
        assert_eq!(
            compiled.rules[0].condition.url_filter.as_deref(),
            Some("||bbc.com/worklife")
        );
        assert_eq!(
            compiled.rules[1].condition.url_filter.as_deref(),
            Some("|https://notion.so/fun|")
        );
        // Entertainment precedes News in catalog order.
        assert_eq!(
            compiled.rules[2].condition.request_domains,
            Some(vec!["netflix.com".to_string()])
        );
        assert_eq!(compiled.rules[3].condition.domain_type, Some(DomainType::FirstParty));
        assert_eq!(
            compiled.rules[4].condition.url_filter.as_deref(),
            Some("|https://old.example/path|")
        );
    }

    #[test]
    fn allowed_contexts_get_no_domain_rule() {
        let domains = map(&[("bbc.com", NEWS), ("notion.so", WORK)]);
        let compiled = compile(&focus(&[WORK]), &[], Some(&domains), &[], 5000);
        assert_eq!(compiled.rules.len(), 1);
        assert_eq!(
            compiled.rules[0].condition.request_domains,
            Some(vec!["bbc.com".to_string()])
        );
        assert!(!compiled.blocked_contexts.contains(&WORK.to_string()));
    }

    #[test]
    fn multi_purpose_domains_never_get_domain_rules() {
        let domains = map(&[("youtube.com", ENTERTAINMENT), ("m.youtube.com", ENTERTAINMENT)]);
        let compiled = compile(&focus(&[WORK]), &[], Some(&domains), &[], 5000);
        assert!(compiled.rules.is_empty());
    }

    #[test]
    fn unknown_contexts_in_domain_map_are_blocked_after_catalog_labels() {
        let domains = map(&[("chess.com", "Games"), ("twitch.tv", "Streaming"), ("x.org", SOCIAL)]);
        let compiled = compile(&focus(&[WORK]), &[], Some(&domains), &[], 5000);
        let tail: Vec<&str> = compiled.blocked_contexts.iter().rev().take(2).map(String::as_str).collect();
        assert_eq!(tail, vec!["Streaming", "Games"]);
        assert_eq!(compiled.rules.len(), 3);
    }

    #[test]
    fn invalid_and_duplicate_patterns_are_skipped() {
        let overrides = vec![
            entry("", NEWS, MatchType::StartsWith),
            entry("https://a.com/has space", NEWS, MatchType::StartsWith),
            entry("https://a.com/x", NEWS, MatchType::Unsupported),
            entry("https://a.com/ok", NEWS, MatchType::StartsWith),
            entry("https://a.com/ok", SOCIAL, MatchType::StartsWith),
        ];
        let compiled = compile(&focus(&[WORK]), &overrides, None, &[], 5000);
        assert_eq!(compiled.rules.len(), 1);
        assert_eq!(compiled.skipped, 3);
    }

    #[test]
    fn missing_domain_map_still_installs_pattern_rules() {
        let overrides = vec![entry("https://a.com/", NEWS, MatchType::StartsWith)];
        let compiled = compile(&focus(&[WORK]), &overrides, None, &[], 5000);
        assert_eq!(compiled.rules.len(), 1);
    }

    #[test]
    fn ceiling_truncates_tail_and_keeps_every_allow_rule() {
        let mut overrides = Vec::new();
        for index in 0..3000 {
            overrides.push(entry(&format!("https://allowed.com/{index}"), WORK, MatchType::StartsWith));
            overrides.push(entry(&format!("https://blocked.com/{index}"), NEWS, MatchType::StartsWith));
        }
        let domains = map(&[("bbc.com", NEWS)]);

        let compiled = compile(&focus(&[WORK]), &overrides, Some(&domains), &[], DEFAULT_MAX_RULES);
        assert_eq!(compiled.rules.len(), DEFAULT_MAX_RULES);
        assert!(compiled.truncated);
        assert_eq!(compiled.allow_count(), 3000);
        assert!(compiled.rules[..3000].iter().all(Rule::is_allow));
        assert!(compiled
            .rules
            .iter()
            .all(|rule| rule.condition.request_domains.is_none()));
        assert_eq!(compiled.rules.last().map(|r| r.id), Some(RULE_ID_OFFSET + 4999));
    }

    /// `||` anchor semantics: the body starts at the host or at a
    /// subdomain boundary, on any scheme.
    fn filter_matches(filter: &str, url: &str) -> bool {
        if let Some(body) = filter.strip_prefix("||") {
            let rest = strip_scheme(url);
            return rest.starts_with(body)
                || rest
                    .match_indices('.')
                    .any(|(index, _)| rest[index + 1..].starts_with(body));
        }
        match filter.strip_prefix('|') {
            Some(body) => match body.strip_suffix('|') {
                Some(exact) => url == exact,
                None => url.starts_with(body),
            },
            None => url.contains(filter),
        }
    }

    #[test]
    fn prefix_allow_rules_cover_every_scheme_the_resolver_matches() {
        let domains = map(&[("bbc.com", NEWS)]);
        let url = "https://bbc.com/worklife/story";

        for pattern in ["bbc.com/worklife", "http://bbc.com/worklife"] {
            let overrides = vec![entry(pattern, WORK, MatchType::StartsWith)];
            assert!(crate::overrides::matches_override(url, &overrides[0]));

            let compiled = compile(&focus(&[WORK]), &overrides, Some(&domains), &[], 5000);
            let allow = &compiled.rules[0];
            assert!(allow.is_allow());
            assert_eq!(allow.condition.url_filter.as_deref(), Some("||bbc.com/worklife"));
            assert!(filter_matches("||bbc.com/worklife", url));
            assert!(allow.priority > compiled.rules[1].priority);
            assert_eq!(
                compiled.rules[1].condition.request_domains,
                Some(vec!["bbc.com".to_string()])
            );
        }
    }

    #[test]
    fn prefix_block_rules_drop_the_scheme_too() {
        let overrides = vec![entry("http://reddit.example/r/funny", SOCIAL, MatchType::StartsWith)];
        let compiled = compile(&focus(&[WORK]), &overrides, None, &[], 5000);
        let filter = compiled.rules[0].condition.url_filter.as_deref();
        assert_eq!(filter, Some("||reddit.example/r/funny"));
        assert!(filter_matches("||reddit.example/r/funny", "https://reddit.example/r/funny/top"));
    }

    #[test]
    fn scheme_only_prefix_is_skipped() {
        let overrides = vec![entry("https://", NEWS, MatchType::StartsWith)];
        let compiled = compile(&focus(&[WORK]), &overrides, None, &[], 5000);
        assert!(compiled.rules.is_empty());
        assert_eq!(compiled.skipped, 1);
    }

    #[test]
    fn mixed_case_domain_keys_collapse_into_one_request_domain() {
        let domains = map(&[("BBC.com", NEWS), ("bbc.com", NEWS), ("abc.net", NEWS)]);
        let compiled = compile(&focus(&[WORK]), &[], Some(&domains), &[], 5000);
        assert_eq!(
            compiled.rules[0].condition.request_domains,
            Some(vec!["abc.net".to_string(), "bbc.com".to_string()])
        );
    }
}
