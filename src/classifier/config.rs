/// Tunable constants of the scoring pipeline.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Weight applied to URL scores when combined with text scores
    pub url_weight: f64,

    /// Multiplier for the page's own domain category, when it already scored
    pub domain_boost: f64,

    /// Fixed inverse-document-frequency factor for keyword scoring
    pub keyword_idf: f64,

    /// Per-matched-term normalizer for keyword scoring
    pub match_normalizer: f64,

    /// Text beyond this many characters is ignored
    pub max_text_chars: usize,

    /// Score assigned to a recognised search-query intent
    pub search_intent_score: f64,

    /// Score assigned to a page whose domain is in the catalog
    pub domain_base_score: f64,

    pub max_secondary_contexts: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            url_weight: 0.3,
            domain_boost: 1.3,
            keyword_idf: 1.5,
            match_normalizer: 0.3,
            max_text_chars: 5000,
            search_intent_score: 0.9,
            domain_base_score: 0.8,
            max_secondary_contexts: 3,
        }
    }
}
