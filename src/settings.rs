use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::classifier::ContextDefinition;

pub const DEFAULT_BLOCKED_PAGE_URL: &str = "focuslens://blocked.html";
pub const DEFAULT_FOCUS_PAGE_URL: &str = "focuslens://focusmode.html";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusSettings {
    pub enabled: bool,
    pub notifications_enabled: bool,
    pub switch_threshold: usize,
    pub time_window_minutes: u32,
    pub focus_window_enabled: bool,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            notifications_enabled: true,
            switch_threshold: 5,
            time_window_minutes: 15,
            focus_window_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub focus_settings: FocusSettings,
    pub auto_group_enabled: bool,
    pub blocked_page_url: String,
    pub focus_page_url: String,
    /// Seconds between session expiry checks
    pub tick_interval_secs: u64,
    /// Drift is checked on every n-th tick
    pub drift_check_every_ticks: u32,
    pub max_rules: usize,
    /// Merged into the built-in context table by label
    pub extra_contexts: Vec<ContextDefinition>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            focus_settings: FocusSettings::default(),
            auto_group_enabled: true,
            blocked_page_url: DEFAULT_BLOCKED_PAGE_URL.into(),
            focus_page_url: DEFAULT_FOCUS_PAGE_URL.into(),
            tick_interval_secs: 60,
            drift_check_every_ticks: 2,
            max_rules: crate::rules::DEFAULT_MAX_RULES,
            extra_contexts: Vec::new(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> UserSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn focus_settings(&self) -> FocusSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .focus_settings
            .clone()
    }

    pub fn update<F>(&self, mutate: F) -> Result<UserSettings>
    where
        F: FnOnce(&mut UserSettings),
    {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        mutate(&mut guard);
        self.persist(&guard)?;
        Ok(guard.clone())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    /// Re-reads the file after an outside edit. A missing file keeps the
    /// current values.
    pub fn reload(&self) -> Result<UserSettings> {
        if !self.path.exists() {
            return Ok(self.get());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(guard.clone())
    }
}
