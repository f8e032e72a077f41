use chrono::{DateTime, TimeZone, Utc};

/// Appends `item` and evicts from the front until `items.len() <= cap`.
pub fn push_capped<T>(items: &mut Vec<T>, item: T, cap: usize) {
    items.push(item);
    if items.len() > cap {
        let overflow = items.len() - cap;
        items.drain(..overflow);
    }
}

/// Domain-map keys are stored trimmed and lowercase.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().to_ascii_lowercase()
}

/// Millisecond epoch timestamps as written by older clients.
pub fn datetime_from_millis(value: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value).single()
}
