//! Stateless feature extraction from a page URL.

use std::sync::OnceLock;

use log::warn;
use regex::Regex;
use url::Url;

use super::catalog::{ContextCatalog, DEVELOPMENT, ENTERTAINMENT, NEWS, RESEARCH, SHOPPING};
use super::config::ClassifierConfig;
use crate::db::models::ScoreMap;

/// Hostname of `url`, or an empty string when the URL does not parse.
pub fn extract_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
        Err(err) => {
            warn!("Could not extract domain from '{url}': {err}");
            String::new()
        }
    }
}

/// Catalog context for `domain`: exact match, then without `www.`, then the
/// last two labels. No other subdomain generalization.
pub fn domain_category<'a>(catalog: &'a ContextCatalog, domain: &str) -> Option<&'a str> {
    let domain = domain.to_ascii_lowercase();
    if let Some(found) = catalog.exact_domain_category(&domain) {
        return Some(found);
    }

    if let Some(stripped) = domain.strip_prefix("www.") {
        if let Some(found) = catalog.exact_domain_category(stripped) {
            return Some(found);
        }
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() > 2 {
        let parent = labels[labels.len() - 2..].join(".");
        return catalog.exact_domain_category(&parent);
    }

    None
}

/// Words longer than two characters from the path segments, split on `-`/`_`.
pub fn extract_path_keywords(url: &str) -> Vec<String> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("Could not extract path keywords from '{url}': {err}");
            return Vec::new();
        }
    };

    parsed
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .flat_map(|segment| segment.split(['-', '_']))
        .filter(|word| word.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

static SEARCH_INTENTS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();

// Evaluated in order; the first match wins.
fn search_intents() -> &'static [(&'static str, Regex)] {
    SEARCH_INTENTS.get_or_init(|| {
        [
            (
                RESEARCH,
                r"research|study|case\s*report|clinical|procedure|surgery|medical|anatomy|pathology|diagnosis|journal|pubmed",
            ),
            (
                DEVELOPMENT,
                r"api|code|github|stackoverflow|library|npm|python|javascript|typescript",
            ),
            (
                NEWS,
                r"breaking|headline|election|war|crisis|covid|biden|trump|senate|congress",
            ),
            (
                SHOPPING,
                r"buy|price|review|discount|deal|amazon|walmart|best\s*buy",
            ),
            (
                ENTERTAINMENT,
                r"movie|tv|trailer|lyrics|song|album|celebrity|kardashian|netflix|spotify",
            ),
        ]
        .into_iter()
        .map(|(label, pattern)| {
            (
                label,
                Regex::new(pattern).expect("search intent patterns are valid"),
            )
        })
        .collect()
    })
}

/// Intent of a search query, if one of the fixed patterns recognises it.
pub fn guess_search_context(query: &str) -> Option<&'static str> {
    let query = query.to_lowercase();
    search_intents()
        .iter()
        .find(|(_, pattern)| pattern.is_match(&query))
        .map(|(label, _)| *label)
}

fn is_search_page(url: &Url) -> bool {
    url.host_str()
        .map(|host| host.contains(".google."))
        .unwrap_or(false)
        && url.path().starts_with("/search")
}

pub fn analyze_url(catalog: &ContextCatalog, config: &ClassifierConfig, url: &str) -> ScoreMap {
    let mut scores = ScoreMap::new();
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("Skipping URL analysis for '{url}': {err}");
            return scores;
        }
    };

    if is_search_page(&parsed) {
        let query = parsed
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        if let Some(intent) = guess_search_context(&query) {
            scores.insert(intent.to_string(), config.search_intent_score);
            return scores;
        }
    }

    let domain = parsed.host_str().unwrap_or_default();
    if let Some(category) = domain_category(catalog, domain) {
        scores.insert(category.to_string(), config.domain_base_score);
    }

    scores
}
