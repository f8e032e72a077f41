//! The single table of context labels shared by every component: which
//! domains belong to a context, which keywords score for it, and how it is
//! shown when tabs are grouped.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub const WORK: &str = "Work";
pub const DEVELOPMENT: &str = "Development";
pub const RESEARCH: &str = "Research";
pub const LEARNING: &str = "Learning";
pub const ENTERTAINMENT: &str = "Entertainment";
pub const SOCIAL: &str = "Social";
pub const SHOPPING: &str = "Shopping";
pub const NEWS: &str = "News";

/// Primary label when no context scored.
pub const GENERAL: &str = "General";
/// Placeholder before anything has been classified.
pub const UNKNOWN: &str = "Unknown";

/// keyword → weight, per context.
pub type KeywordTable = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextDefinition {
    pub label: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub keywords: BTreeMap<String, f64>,
}

fn default_color() -> String {
    "grey".to_string()
}

impl ContextDefinition {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.label)
    }
}

#[derive(Debug, Clone)]
pub struct ContextCatalog {
    definitions: Vec<ContextDefinition>,
    domain_index: HashMap<String, usize>,
}

impl Default for ContextCatalog {
    fn default() -> Self {
        let definitions = DEFAULT_CONTEXTS
            .iter()
            .map(|(label, color, domains, keywords)| ContextDefinition {
                label: label.to_string(),
                display_name: None,
                color: color.to_string(),
                domains: domains.iter().map(|d| d.to_string()).collect(),
                keywords: keywords
                    .iter()
                    .map(|(word, weight)| (word.to_string(), *weight))
                    .collect(),
            })
            .collect();
        Self::from_definitions(definitions)
    }
}

impl ContextCatalog {
    pub fn from_definitions(definitions: Vec<ContextDefinition>) -> Self {
        let mut catalog = Self {
            definitions,
            domain_index: HashMap::new(),
        };
        catalog.reindex();
        catalog
    }

    /// Adds new contexts and replaces existing ones with the same label.
    pub fn with_extra(mut self, extra: Vec<ContextDefinition>) -> Self {
        for definition in extra {
            match self
                .definitions
                .iter_mut()
                .find(|existing| existing.label == definition.label)
            {
                Some(existing) => *existing = definition,
                None => self.definitions.push(definition),
            }
        }
        self.reindex();
        self
    }

    fn reindex(&mut self) {
        self.domain_index.clear();
        for (index, definition) in self.definitions.iter().enumerate() {
            for domain in &definition.domains {
                self.domain_index
                    .entry(domain.to_ascii_lowercase())
                    .or_insert(index);
            }
        }
    }

    /// Labels in catalog order; used wherever "all known contexts" is needed.
    pub fn labels(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.label.as_str()).collect()
    }

    /// Converts an old-style blocked list into an allowed list.
    pub fn allowed_excluding(&self, blocked: &[String]) -> Vec<String> {
        self.labels()
            .into_iter()
            .filter(|label| !blocked.iter().any(|b| b == label))
            .map(str::to_string)
            .collect()
    }

    pub fn definitions(&self) -> &[ContextDefinition] {
        &self.definitions
    }

    pub fn definition(&self, label: &str) -> Option<&ContextDefinition> {
        self.definitions.iter().find(|d| d.label == label)
    }

    pub fn is_known(&self, label: &str) -> bool {
        self.definition(label).is_some()
    }

    pub fn color_for(&self, label: &str) -> &str {
        self.definition(label)
            .map(|d| d.color.as_str())
            .unwrap_or("grey")
    }

    /// Exact hostname lookup against the static domain table.
    pub fn exact_domain_category(&self, domain: &str) -> Option<&str> {
        self.domain_index
            .get(domain)
            .map(|index| self.definitions[*index].label.as_str())
    }

    /// Every catalog domain with its context, for seeding the domain map.
    pub fn domain_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.definitions.iter().flat_map(|definition| {
            definition
                .domains
                .iter()
                .map(move |domain| (domain.as_str(), definition.label.as_str()))
        })
    }

    pub fn keyword_table(&self) -> KeywordTable {
        self.definitions
            .iter()
            .filter(|d| !d.keywords.is_empty())
            .map(|d| (d.label.clone(), d.keywords.clone()))
            .collect()
    }
}

type ContextSeed = (
    &'static str,
    &'static str,
    &'static [&'static str],
    &'static [(&'static str, f64)],
);

const DEFAULT_CONTEXTS: &[ContextSeed] = &[
    (
        WORK,
        "yellow",
        &[
            "docs.google.com", "sheets.google.com", "slides.google.com", "drive.google.com",
            "office.com", "microsoft365.com", "linkedin.com", "slack.com",
            "teams.microsoft.com", "asana.com", "trello.com", "notion.so", "monday.com",
            "atlassian.com", "jira.com", "basecamp.com", "zoom.us",
        ],
        &[
            ("project", 0.8), ("deadline", 0.9), ("meeting", 0.7), ("task", 0.8),
            ("client", 0.8), ("report", 0.7), ("presentation", 0.7), ("office", 0.6),
            ("business", 0.8), ("email", 0.6), ("colleague", 0.7), ("manager", 0.7),
            ("workflow", 0.8), ("productivity", 0.7), ("professional", 0.7),
        ],
    ),
    (
        DEVELOPMENT,
        "orange",
        &[
            "github.com", "gitlab.com", "bitbucket.org", "stackoverflow.com",
            "developer.mozilla.org", "w3schools.com", "codepen.io", "replit.com",
            "codesandbox.io", "jsfiddle.net", "npmjs.com", "pypi.org", "docker.com",
            "kubernetes.io", "digitalocean.com",
        ],
        &[
            ("code", 0.9), ("programming", 0.9), ("developer", 0.9), ("software", 0.8),
            ("github", 0.9), ("git", 0.8), ("repository", 0.8), ("commit", 0.8),
            ("function", 0.7), ("class", 0.7), ("method", 0.7), ("variable", 0.7),
            ("object", 0.7), ("array", 0.7), ("string", 0.7), ("stack", 0.8),
            ("overflow", 0.8), ("javascript", 0.8), ("python", 0.8), ("typescript", 0.8),
        ],
    ),
    (
        RESEARCH,
        "pink",
        &[
            "scholar.google.com", "pubmed.ncbi.nlm.nih.gov", "researchgate.net",
            "academia.edu", "jstor.org", "springer.com", "sciencedirect.com", "ieee.org",
            "ncbi.nlm.nih.gov", "arxiv.org", "sciencemag.org", "nature.com",
            "webofknowledge.com", "scopus.com", "mendeley.com",
        ],
        &[
            ("research", 0.9), ("study", 0.8), ("analysis", 0.8), ("data", 0.7),
            ("information", 0.6), ("journal", 0.9), ("article", 0.8), ("paper", 0.7),
            ("science", 0.8), ("scientific", 0.8), ("academic", 0.9), ("scholar", 0.9),
            ("experiment", 0.8), ("theory", 0.7), ("hypothesis", 0.8), ("methodology", 0.8),
            ("finding", 0.7), ("conclude", 0.7), ("reference", 0.7), ("citation", 0.8),
        ],
    ),
    (
        LEARNING,
        "blue",
        &[
            "coursera.org", "udemy.com", "edx.org", "khanacademy.org", "duolingo.com",
            "canvas.instructure.com", "blackboard.com", "quizlet.com", "chegg.com",
            "brilliant.org", "codecademy.com", "freecodecamp.org", "lynda.com",
            "skillshare.com", "pluralsight.com",
        ],
        &[
            ("course", 0.9), ("lesson", 0.8), ("tutorial", 0.9), ("learn", 0.8),
            ("study", 0.9), ("education", 0.7), ("assignment", 0.9), ("homework", 0.9),
            ("university", 0.8), ("college", 0.8), ("school", 0.7), ("academy", 0.7),
            ("lecture", 0.9), ("professor", 0.8), ("student", 0.7), ("quiz", 0.8),
            ("exam", 0.9), ("test", 0.7), ("knowledge", 0.6), ("textbook", 0.8),
            ("admissions", 0.9), ("academics", 0.8), ("majors", 0.8), ("undergraduate", 0.9),
            ("graduate", 0.9), ("faculty", 0.7), ("syllabus", 0.8), ("transcript", 0.7),
            ("campus", 0.6), ("enroll", 0.9),
        ],
    ),
    (
        ENTERTAINMENT,
        "green",
        &[
            "netflix.com", "hulu.com", "disneyplus.com", "hbomax.com", "youtube.com",
            "twitch.tv", "spotify.com", "pandora.com", "tidal.com", "soundcloud.com",
            "steam.com", "epicgames.com", "ign.com", "imdb.com", "rottentomatoes.com",
        ],
        &[
            ("movie", 0.9), ("show", 0.7), ("stream", 0.7), ("watch", 0.6), ("video", 0.7),
            ("game", 0.8), ("play", 0.6), ("fun", 0.7), ("music", 0.8), ("song", 0.8),
            ("entertainment", 0.9), ("netflix", 0.9), ("youtube", 0.8), ("hulu", 0.9),
            ("disney", 0.8), ("hbo", 0.9), ("amazon", 0.5), ("twitch", 0.9), ("gaming", 0.9),
        ],
    ),
    (
        SOCIAL,
        "cyan",
        &[
            "facebook.com", "twitter.com", "instagram.com", "reddit.com", "pinterest.com",
            "tumblr.com", "tiktok.com", "snapchat.com", "discord.com", "messenger.com",
            "telegram.org", "whatsapp.com", "signal.org", "medium.com", "quora.com",
        ],
        &[
            ("friend", 0.8), ("message", 0.7), ("chat", 0.8), ("post", 0.7), ("share", 0.7),
            ("social", 0.9), ("network", 0.7), ("facebook", 0.9), ("twitter", 0.9),
            ("instagram", 0.9), ("snapchat", 0.9), ("tiktok", 0.9), ("linkedin", 0.9),
            ("reddit", 0.8), ("forum", 0.7), ("comment", 0.7), ("like", 0.6), ("follow", 0.6),
            ("connect", 0.7), ("profile", 0.8),
        ],
    ),
    (
        SHOPPING,
        "purple",
        &[
            "amazon.com", "ebay.com", "walmart.com", "target.com", "bestbuy.com", "etsy.com",
            "aliexpress.com", "wayfair.com", "costco.com", "newegg.com", "homedepot.com",
            "lowes.com", "macys.com", "nordstrom.com", "zappos.com",
        ],
        &[
            ("shop", 0.9), ("buy", 0.8), ("purchase", 0.8), ("order", 0.7), ("cart", 0.9),
            ("checkout", 0.9), ("price", 0.8), ("discount", 0.8), ("product", 0.8),
            ("item", 0.7), ("amazon", 0.8), ("ebay", 0.9), ("etsy", 0.9), ("store", 0.8),
            ("mall", 0.8), ("shipping", 0.8), ("delivery", 0.7), ("payment", 0.8),
            ("credit", 0.7), ("review", 0.6),
        ],
    ),
    (
        NEWS,
        "red",
        &[
            "cnn.com", "bbc.com", "nytimes.com", "washingtonpost.com", "reuters.com",
            "apnews.com", "foxnews.com", "nbcnews.com", "abcnews.go.com", "cbsnews.com",
            "politico.com", "economist.com", "wsj.com", "bloomberg.com", "theguardian.com",
        ],
        &[
            ("news", 0.9), ("article", 0.7), ("report", 0.6), ("breaking", 0.8),
            ("headline", 0.9), ("journalist", 0.8), ("media", 0.7), ("press", 0.7),
            ("update", 0.6), ("current", 0.6), ("politics", 0.7), ("election", 0.7),
            ("government", 0.6), ("president", 0.6), ("minister", 0.6), ("cnn", 0.9),
            ("bbc", 0.9), ("nyt", 0.9), ("reuters", 0.9), ("associated", 0.7),
        ],
    ),
];
