//! Typed accessors, one read/write pair per persisted entity.
//!
//! Each mutating accessor is a single `update_value` call, so the
//! read-modify-write of one collection is atomic. Nothing coordinates
//! writes that span two collections.

mod context_history;
mod context_keywords;
mod domain_map;
mod feedback_log;
mod focus;
mod legacy;
mod parked_links;
mod url_overrides;
mod workspaces;

pub use context_history::CONTEXT_HISTORY_CAP;
pub use feedback_log::FEEDBACK_LOG_CAP;
pub use legacy::LegacySession;
