pub mod commands;
pub mod multi_purpose;
pub mod resolver;

pub use multi_purpose::{is_multi_purpose_domain, MULTI_PURPOSE_DOMAINS};
pub use resolver::{
    find_matching_override, lookup_domain_context, matches_override, resolve_context,
    sort_by_precedence, ContextSource, ResolvedContext,
};
