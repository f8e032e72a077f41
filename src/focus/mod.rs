pub mod browser;
pub mod commands;
pub mod controller;
pub mod state;

pub use browser::{BrowserCommand, BrowserSurface, HostBrowser, TabInfo};
pub use controller::{DriftWarning, FocusController, TransitionReport};
pub use state::FocusState;
