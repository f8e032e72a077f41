use anyhow::{Context, Result};
use url::{form_urlencoded, Url};

use crate::db::models::MatchType;

/// Pattern for a URL-scoped correction: origin plus path, matched exactly.
/// Search result pages keep their query and match as a prefix so that
/// tracking parameters appended later still match.
pub fn synthesize_pattern(raw_url: &str) -> Result<(String, MatchType)> {
    let url = Url::parse(raw_url).with_context(|| format!("cannot build pattern from '{raw_url}'"))?;
    let mut pattern = format!("{}{}", url.origin().ascii_serialization(), url.path());

    let is_google_search = url
        .host_str()
        .is_some_and(|host| host.ends_with("google.com"))
        && url.path() == "/search";

    if is_google_search {
        let query = url
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());
        if let Some(query) = query {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .append_pair("q", &query)
                .finish();
            pattern.push('?');
            pattern.push_str(&encoded);
            return Ok((pattern, MatchType::StartsWith));
        }
    }

    Ok((pattern, MatchType::Exact))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pages_drop_query_and_match_exactly() {
        let (pattern, match_type) =
            synthesize_pattern("https://www.youtube.com/watch?v=abc&t=10").unwrap();
        assert_eq!(pattern, "https://www.youtube.com/watch");
        assert_eq!(match_type, MatchType::Exact);
    }

    #[test]
    fn search_pages_keep_query_as_prefix() {
        let (pattern, match_type) =
            synthesize_pattern("https://www.google.com/search?q=rust+async&hl=en").unwrap();
        assert_eq!(pattern, "https://www.google.com/search?q=rust+async");
        assert_eq!(match_type, MatchType::StartsWith);
    }

    #[test]
    fn search_without_query_is_exact() {
        let (pattern, match_type) = synthesize_pattern("https://www.google.com/search").unwrap();
        assert_eq!(pattern, "https://www.google.com/search");
        assert_eq!(match_type, MatchType::Exact);
    }

    #[test]
    fn malformed_urls_are_rejected() {
        assert!(synthesize_pattern("not a url").is_err());
    }
}
