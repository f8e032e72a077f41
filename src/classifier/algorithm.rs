use super::catalog::{ContextCatalog, KeywordTable};
use super::config::ClassifierConfig;
use super::signals::{analyze_url, domain_category, extract_domain};
use super::text::analyze_text;
use crate::db::models::{ContextResult, PageSignal, ScoreMap, SecondaryContext};

/// Merges text and URL scores. The page's own domain category is boosted
/// only when it already scored, so the boost never introduces a label.
pub fn combine_scores(
    text_scores: &ScoreMap,
    url_scores: &ScoreMap,
    domain_category: Option<&str>,
    config: &ClassifierConfig,
) -> ScoreMap {
    let mut combined = ScoreMap::new();

    for (context, score) in text_scores {
        *combined.entry(context.clone()).or_insert(0.0) += score;
    }
    for (context, score) in url_scores {
        *combined.entry(context.clone()).or_insert(0.0) += score * config.url_weight;
    }

    if let Some(category) = domain_category {
        if let Some(score) = combined.get_mut(category) {
            if *score > 0.0 {
                *score *= config.domain_boost;
            }
        }
    }

    combined
}

/// Ranks the combined scores into a result. Ties keep alphabetical order.
pub fn format_result(combined: ScoreMap, config: &ClassifierConfig) -> ContextResult {
    let mut ranked: Vec<(&str, f64)> = combined
        .iter()
        .filter(|(_, score)| **score > 0.0)
        .map(|(context, score)| (context.as_str(), *score))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let Some(&(primary, top_score)) = ranked.first() else {
        return ContextResult::general();
    };

    let secondary_contexts = ranked
        .iter()
        .skip(1)
        .take(config.max_secondary_contexts)
        .map(|(context, score)| SecondaryContext {
            context: context.to_string(),
            confidence: score.clamp(0.0, 1.0),
        })
        .collect();

    ContextResult {
        primary_context: primary.to_string(),
        confidence: top_score.clamp(0.0, 1.0),
        secondary_contexts,
        features: Some(combined),
    }
}

fn page_text(signal: &PageSignal) -> String {
    let mut parts: Vec<&str> = vec![&signal.title, &signal.meta_description];
    parts.extend(signal.meta_keywords.iter().map(String::as_str));
    parts.push(&signal.full_text);
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classifies one page view without touching any state.
pub fn score_page(
    catalog: &ContextCatalog,
    keywords: &KeywordTable,
    config: &ClassifierConfig,
    signal: &PageSignal,
) -> ContextResult {
    let text_scores = analyze_text(&page_text(signal), keywords, config);
    let url_scores = analyze_url(catalog, config, &signal.url);

    let domain = extract_domain(&signal.url);
    let category = domain_category(catalog, &domain);

    let combined = combine_scores(&text_scores, &url_scores, category, config);
    format_result(combined, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::catalog::{DEVELOPMENT, GENERAL, NEWS, RESEARCH, SHOPPING, WORK};
    use pretty_assertions::assert_eq;

    fn scores(entries: &[(&str, f64)]) -> ScoreMap {
        entries
            .iter()
            .map(|(context, score)| (context.to_string(), *score))
            .collect()
    }

    #[test]
    fn url_scores_are_weighted() {
        let combined = combine_scores(
            &scores(&[(WORK, 0.2)]),
            &scores(&[(WORK, 0.5), (NEWS, 1.0)]),
            None,
            &ClassifierConfig::default(),
        );
        assert!((combined[WORK] - 0.35).abs() < 1e-9);
        assert!((combined[NEWS] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn domain_boost_requires_existing_score() {
        let config = ClassifierConfig::default();
        let boosted = combine_scores(&scores(&[(WORK, 0.5)]), &ScoreMap::new(), Some(WORK), &config);
        assert!((boosted[WORK] - 0.65).abs() < 1e-9);

        let untouched =
            combine_scores(&scores(&[(WORK, 0.5)]), &ScoreMap::new(), Some(NEWS), &config);
        assert!(!untouched.contains_key(NEWS));

        let zero = combine_scores(&scores(&[(NEWS, 0.0)]), &ScoreMap::new(), Some(NEWS), &config);
        assert_eq!(zero[NEWS], 0.0);
    }

    #[test]
    fn all_zero_scores_fall_back_to_general() {
        let result = format_result(scores(&[(WORK, 0.0)]), &ClassifierConfig::default());
        assert_eq!(result, ContextResult::general());
        assert_eq!(result.primary_context, GENERAL);
    }

    #[test]
    fn secondary_contexts_are_capped_and_sorted() {
        let result = format_result(
            scores(&[
                (WORK, 0.9),
                (NEWS, 0.2),
                (RESEARCH, 0.5),
                (SHOPPING, 0.4),
                (DEVELOPMENT, 0.1),
            ]),
            &ClassifierConfig::default(),
        );
        assert_eq!(result.primary_context, WORK);
        let secondary: Vec<&str> = result
            .secondary_contexts
            .iter()
            .map(|entry| entry.context.as_str())
            .collect();
        assert_eq!(secondary, vec![RESEARCH, SHOPPING, NEWS]);
        assert_eq!(result.features.map(|features| features.len()), Some(5));
    }

    #[test]
    fn equal_scores_rank_alphabetically() {
        let result = format_result(scores(&[(WORK, 0.4), (NEWS, 0.4)]), &ClassifierConfig::default());
        assert_eq!(result.primary_context, NEWS);
    }

    #[test]
    fn github_page_with_code_words_is_development() {
        let catalog = ContextCatalog::default();
        let signal = PageSignal {
            url: "https://github.com/foo/bar".into(),
            full_text: "commit function variable".into(),
            ..PageSignal::default()
        };
        let result = score_page(
            &catalog,
            &catalog.keyword_table(),
            &ClassifierConfig::default(),
            &signal,
        );
        assert_eq!(result.primary_context, DEVELOPMENT);
        assert!(result.confidence > 0.0);
        // text 1.0 + url 0.8 * 0.3, then boosted by 1.3
        let raw = result.features.unwrap()[DEVELOPMENT];
        assert!((raw - 1.24 * 1.3).abs() < 1e-9);
    }

    #[test]
    fn empty_page_is_general() {
        let catalog = ContextCatalog::default();
        let result = score_page(
            &catalog,
            &catalog.keyword_table(),
            &ClassifierConfig::default(),
            &PageSignal::default(),
        );
        assert_eq!(result.primary_context, GENERAL);
    }
}
