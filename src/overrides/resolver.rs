//! Three-tier context precedence: URL-pattern override, then the domain
//! map, then the classifier.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use super::multi_purpose::is_multi_purpose_domain;
use crate::db::models::{DomainContextMap, MatchType, UrlPatternOverride};

fn precedence_key(entry: &UrlPatternOverride) -> (Reverse<i64>, Reverse<DateTime<Utc>>) {
    (Reverse(entry.priority), Reverse(entry.created_at))
}

/// Highest priority first, then most recently created. The sort is stable,
/// so entries tied on both keep their relative order.
pub fn sort_by_precedence(overrides: &mut [UrlPatternOverride]) {
    overrides.sort_by_key(precedence_key);
}

pub fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map_or(url, |(_, rest)| rest)
}

pub fn matches_override(url: &str, entry: &UrlPatternOverride) -> bool {
    if entry.pattern.is_empty() {
        return false;
    }
    match entry.match_type {
        MatchType::Exact => url == entry.pattern,
        MatchType::StartsWith => {
            url.starts_with(&entry.pattern)
                || strip_scheme(url).starts_with(strip_scheme(&entry.pattern))
        }
        MatchType::Unsupported => {
            warn!(
                "Ignoring override '{}' with unsupported match type",
                entry.pattern
            );
            false
        }
    }
}

/// The override that wins for `url`, regardless of how `overrides` is ordered.
pub fn find_matching_override<'a>(
    url: &str,
    overrides: &'a [UrlPatternOverride],
) -> Option<&'a UrlPatternOverride> {
    let mut ordered: Vec<&UrlPatternOverride> = overrides.iter().collect();
    ordered.sort_by_key(|entry| precedence_key(entry));
    ordered
        .into_iter()
        .find(|entry| matches_override(url, entry))
}

/// Looks `domain` up in the map, then each parent domain down to two
/// labels. Multi-purpose entries are ignored.
pub fn lookup_domain_context<'a>(domain: &str, map: &'a DomainContextMap) -> Option<&'a str> {
    let domain = domain.trim().to_ascii_lowercase();
    let mut candidate = domain.as_str();
    loop {
        if !candidate.is_empty() && !is_multi_purpose_domain(candidate) {
            if let Some(context) = map.get(candidate) {
                return Some(context.as_str());
            }
        }
        match candidate.split_once('.') {
            Some((_, parent)) if parent.contains('.') => candidate = parent,
            _ => return None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContextSource {
    UrlPattern,
    Domain,
    Classifier,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContext {
    pub context: String,
    pub source: ContextSource,
}

/// Applies the precedence rule. `classified` is used only when neither
/// override kind applies; with no classifier output there may be no answer.
pub fn resolve_context(
    url: &str,
    domain: &str,
    overrides: &[UrlPatternOverride],
    domain_map: &DomainContextMap,
    classified: Option<&str>,
) -> Option<ResolvedContext> {
    if let Some(entry) = find_matching_override(url, overrides) {
        return Some(ResolvedContext {
            context: entry.context.clone(),
            source: ContextSource::UrlPattern,
        });
    }
    if let Some(context) = lookup_domain_context(domain, domain_map) {
        return Some(ResolvedContext {
            context: context.to_string(),
            source: ContextSource::Domain,
        });
    }
    classified.map(|context| ResolvedContext {
        context: context.to_string(),
        source: ContextSource::Classifier,
    })
}
