/// Domains that host unrelated content under one name. They never receive a
/// domain-wide context; corrections for them must be URL patterns.
pub const MULTI_PURPOSE_DOMAINS: [&str; 10] = [
    "google.com",
    "youtube.com",
    "reddit.com",
    "amazon.com",
    "twitter.com",
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "github.com",
    "medium.com",
];

/// True for a listed domain or any subdomain of one.
pub fn is_multi_purpose_domain(domain: &str) -> bool {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    MULTI_PURPOSE_DOMAINS.iter().any(|listed| {
        domain
            .strip_suffix(listed)
            .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
    })
}
