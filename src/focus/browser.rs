//! The tab/window surface the core drives, and the mirror implementation
//! used when the browser lives in another process.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::models::{TabGroupSnapshot, TabSnapshot, WindowSnapshot};
use crate::events::EventEmitter;

#[async_trait]
pub trait BrowserSurface: Send + Sync {
    /// Every window with its restorable tabs; browser-internal pages excluded.
    async fn snapshot_windows(&self) -> Result<Vec<WindowSnapshot>>;

    /// Leaves a single tab showing `url` and closes everything else.
    async fn collapse_to_page(&self, url: &str) -> Result<()>;

    async fn restore_windows(&self, windows: &[WindowSnapshot]) -> Result<()>;

    async fn tab_groups(&self) -> Result<Vec<TabGroupSnapshot>>;

    async fn open_tab(&self, url: &str, active: bool) -> Result<i64>;

    async fn group_tabs(&self, tab_ids: &[i64], title: &str, color: &str) -> Result<()>;

    async fn navigate_tab(&self, tab_id: i64, url: &str) -> Result<()>;

    async fn ungroup_all(&self) -> Result<()>;

    /// Host report of a created or updated tab. Surfaces that query the
    /// browser directly have nothing to record.
    async fn observe_tab(&self, _tab: TabInfo) {}

    async fn observe_tab_removed(&self, _tab_id: i64) {}
}

pub fn is_internal_url(url: &str) -> bool {
    url.starts_with("chrome://") || url.starts_with("chrome-extension://") || url == "about:blank"
}

/// A tab as reported by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TabInfo {
    pub tab_id: i64,
    pub window_id: i64,
    pub url: String,
    pub pinned: bool,
    pub active: bool,
    pub group_title: Option<String>,
    pub group_color: Option<String>,
    pub window_state: Option<String>,
    pub window_focused: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(
    tag = "command",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum BrowserCommand {
    CollapseTo { url: String },
    RestoreWindows { windows: Vec<WindowSnapshot> },
    OpenTab { tab_id: i64, url: String, active: bool },
    GroupTabs { tab_ids: Vec<i64>, title: String, color: String },
    NavigateTab { tab_id: i64, url: String },
    UngroupAll,
}

/// Tab ids handed out for tabs the core asks the host to open. The host
/// adopts them when it reports the tab back.
const FIRST_LOCAL_TAB_ID: i64 = 1 << 40;

#[derive(Default)]
struct Mirror {
    tabs: BTreeMap<i64, TabInfo>,
    next_tab_id: i64,
}

/// Keeps a best-effort mirror of the host's tabs and turns every mutation
/// into a `browser-command` event for the host to carry out.
pub struct HostBrowser {
    mirror: Mutex<Mirror>,
    events: EventEmitter,
}

impl HostBrowser {
    pub fn new(events: EventEmitter) -> Self {
        Self {
            mirror: Mutex::new(Mirror {
                tabs: BTreeMap::new(),
                next_tab_id: FIRST_LOCAL_TAB_ID,
            }),
            events,
        }
    }

    pub async fn record_tab(&self, tab: TabInfo) {
        self.mirror.lock().await.tabs.insert(tab.tab_id, tab);
    }

    pub async fn forget_tab(&self, tab_id: i64) {
        self.mirror.lock().await.tabs.remove(&tab_id);
    }

    pub async fn tab(&self, tab_id: i64) -> Option<TabInfo> {
        self.mirror.lock().await.tabs.get(&tab_id).cloned()
    }

    fn send(&self, command: BrowserCommand) -> Result<()> {
        self.events.emit("browser-command", command)
    }
}

#[async_trait]
impl BrowserSurface for HostBrowser {
    async fn snapshot_windows(&self) -> Result<Vec<WindowSnapshot>> {
        let mirror = self.mirror.lock().await;
        let mut windows: BTreeMap<i64, WindowSnapshot> = BTreeMap::new();
        for tab in mirror.tabs.values() {
            let window = windows.entry(tab.window_id).or_default();
            if tab.window_state.is_some() {
                window.state = tab.window_state.clone();
            }
            window.focused |= tab.window_focused;
            if !is_internal_url(&tab.url) {
                window.tabs.push(TabSnapshot {
                    url: tab.url.clone(),
                    pinned: tab.pinned,
                    active: tab.active,
                });
            }
        }
        Ok(windows.into_values().collect())
    }

    async fn collapse_to_page(&self, url: &str) -> Result<()> {
        {
            let mut mirror = self.mirror.lock().await;
            mirror.tabs.clear();
            let tab_id = mirror.next_tab_id;
            mirror.next_tab_id += 1;
            mirror.tabs.insert(
                tab_id,
                TabInfo {
                    tab_id,
                    url: url.to_string(),
                    active: true,
                    ..TabInfo::default()
                },
            );
        }
        self.send(BrowserCommand::CollapseTo {
            url: url.to_string(),
        })
    }

    async fn restore_windows(&self, windows: &[WindowSnapshot]) -> Result<()> {
        self.send(BrowserCommand::RestoreWindows {
            windows: windows.to_vec(),
        })
    }

    async fn tab_groups(&self) -> Result<Vec<TabGroupSnapshot>> {
        let mirror = self.mirror.lock().await;
        let mut groups: Vec<TabGroupSnapshot> = Vec::new();
        for tab in mirror.tabs.values() {
            let Some(title) = &tab.group_title else {
                continue;
            };
            match groups.iter_mut().find(|group| &group.title == title) {
                Some(group) => group.tab_urls.push(tab.url.clone()),
                None => groups.push(TabGroupSnapshot {
                    group_id: groups.len() as i64,
                    title: title.clone(),
                    color: tab.group_color.clone().unwrap_or_else(|| "grey".into()),
                    tab_urls: vec![tab.url.clone()],
                }),
            }
        }
        Ok(groups)
    }

    async fn open_tab(&self, url: &str, active: bool) -> Result<i64> {
        let tab_id = {
            let mut mirror = self.mirror.lock().await;
            let tab_id = mirror.next_tab_id;
            mirror.next_tab_id += 1;
            mirror.tabs.insert(
                tab_id,
                TabInfo {
                    tab_id,
                    url: url.to_string(),
                    active,
                    ..TabInfo::default()
                },
            );
            tab_id
        };
        self.send(BrowserCommand::OpenTab {
            tab_id,
            url: url.to_string(),
            active,
        })?;
        Ok(tab_id)
    }

    async fn group_tabs(&self, tab_ids: &[i64], title: &str, color: &str) -> Result<()> {
        {
            let mut mirror = self.mirror.lock().await;
            for tab_id in tab_ids {
                if let Some(tab) = mirror.tabs.get_mut(tab_id) {
                    tab.group_title = Some(title.to_string());
                    tab.group_color = Some(color.to_string());
                }
            }
        }
        self.send(BrowserCommand::GroupTabs {
            tab_ids: tab_ids.to_vec(),
            title: title.to_string(),
            color: color.to_string(),
        })
    }

    async fn navigate_tab(&self, tab_id: i64, url: &str) -> Result<()> {
        if let Some(tab) = self.mirror.lock().await.tabs.get_mut(&tab_id) {
            tab.url = url.to_string();
        }
        self.send(BrowserCommand::NavigateTab {
            tab_id,
            url: url.to_string(),
        })
    }

    async fn ungroup_all(&self) -> Result<()> {
        for tab in self.mirror.lock().await.tabs.values_mut() {
            tab.group_title = None;
            tab.group_color = None;
        }
        self.send(BrowserCommand::UngroupAll)
    }

    async fn observe_tab(&self, tab: TabInfo) {
        self.record_tab(tab).await;
    }

    async fn observe_tab_removed(&self, tab_id: i64) {
        self.forget_tab(tab_id).await;
    }
}
