//! Names of the persisted keys. Every read and write goes through the
//! typed accessors in `repositories`, never through these strings directly.

pub const FOCUS_STATE: &str = "focusState";
pub const DOMAIN_CONTEXT_MAP: &str = "domainContextMap";
pub const URL_PATTERN_OVERRIDES: &str = "urlPatternOverrides";
pub const FEEDBACK_LOG: &str = "classificationFeedbackLog";
pub const CONTEXT_HISTORY: &str = "contextHistory";
pub const CONTEXT_KEYWORDS: &str = "contextKeywords";
pub const PARKED_LINKS: &str = "parkedLinks";
pub const SAVED_WORKSPACES: &str = "savedWorkspaces";
pub const FOCUS_BACKUP: &str = "focusBackup";
pub const PATH_OVERRIDES: &str = "pathOverrides";

// Pre-`focusState` session format.
pub const LEGACY_SESSION_ACTIVE: &str = "focusSessionActive";
pub const LEGACY_SESSION_END_TIME: &str = "focusSessionEndTime";
pub const LEGACY_BLOCKED_CATEGORIES: &str = "blockedCategories";
