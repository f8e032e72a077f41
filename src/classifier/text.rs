//! Fixed-weight keyword scoring of page text.
//!
//! This is deliberately not TF-IDF: the inverse document frequency is a
//! constant (`ClassifierConfig::keyword_idf`) because there is no corpus
//! to derive it from.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::catalog::KeywordTable;
use super::config::ClassifierConfig;
use crate::db::models::ScoreMap;

static BOILERPLATE: OnceLock<Vec<Regex>> = OnceLock::new();
static WHITESPACE: OnceLock<Regex> = OnceLock::new();
static NON_WORD: OnceLock<Regex> = OnceLock::new();

fn boilerplate_patterns() -> &'static [Regex] {
    BOILERPLATE.get_or_init(|| {
        [
            r"(?is)<header[^>]*>.*?</header>",
            r"(?is)<footer[^>]*>.*?</footer>",
            r"(?is)<nav[^>]*>.*?</nav>",
            r"(?is)<script[^>]*>.*?</script>",
            r"(?is)<style[^>]*>.*?</style>",
            r"(?s)<!--.*?-->",
            r"(?i)cookie|privacy|terms|menu|navigation|footer|header|sidebar",
        ]
        .into_iter()
        .map(|pattern| Regex::new(pattern).expect("boilerplate patterns are valid"))
        .collect()
    })
}

/// Strips page chrome, collapses whitespace and caps the length.
pub fn preprocess_text(text: &str, max_chars: usize) -> String {
    let mut processed = text.to_string();
    for pattern in boilerplate_patterns() {
        processed = pattern.replace_all(&processed, " ").into_owned();
    }

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let processed = whitespace.replace_all(&processed, " ");
    let processed = processed.trim();

    match processed.char_indices().nth(max_chars) {
        Some((cut, _)) => processed[..cut].to_string(),
        None => processed.to_string(),
    }
}

/// Per-context keyword score in `[0, 1]`. Contexts with no matched keyword
/// score exactly 0.
pub fn score_keywords(text: &str, keywords: &KeywordTable, config: &ClassifierConfig) -> ScoreMap {
    let lower = text.to_lowercase();
    let non_word = NON_WORD.get_or_init(|| Regex::new(r"\W+").expect("valid regex"));

    let mut term_freq: HashMap<&str, usize> = HashMap::new();
    let mut total_words = 0usize;
    for word in non_word.split(&lower).filter(|word| !word.is_empty()) {
        *term_freq.entry(word).or_insert(0) += 1;
        total_words += 1;
    }

    let mut scores = ScoreMap::new();
    for (context, weights) in keywords {
        let mut context_score = 0.0;
        let mut matched_terms = 0usize;

        for (keyword, weight) in weights {
            if let Some(count) = term_freq.get(keyword.as_str()) {
                let tf = *count as f64 / total_words as f64;
                context_score += tf * config.keyword_idf * weight;
                matched_terms += 1;
            }
        }

        let score = if matched_terms > 0 {
            (context_score / (matched_terms as f64 * config.match_normalizer)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        scores.insert(context.clone(), score);
    }

    scores
}

pub fn analyze_text(text: &str, keywords: &KeywordTable, config: &ClassifierConfig) -> ScoreMap {
    let processed = preprocess_text(text, config.max_text_chars);
    score_keywords(&processed, keywords, config)
}
