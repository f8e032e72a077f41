pub mod switches;
pub mod tracker;

pub use switches::{context_switches, current_streak, focus_status, is_lost_focus, FocusStatus};
pub use tracker::ContextTracker;
