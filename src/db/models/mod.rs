pub mod context;
pub mod feedback;
pub mod overrides;
pub mod parked_link;
pub mod workspace;

pub use context::{
    ContextHistoryEntry, ContextResult, ContextSwitch, PageSignal, ScoreMap, SecondaryContext,
};
pub use feedback::{ClassificationFeedback, CorrectionCount, FeedbackStatistics};
pub use overrides::{DomainContextMap, MatchType, UrlPatternOverride};
pub use parked_link::ParkedLink;
pub use workspace::{SavedWorkspace, TabGroupSnapshot, TabSnapshot, WindowSnapshot};
