use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use super::{BrowserSurface, FocusState};
use crate::db::Database;
use crate::events::EventEmitter;
use crate::history::{ContextTracker, FocusStatus};
use crate::parking::ParkingLot;
use crate::rules::BlockingRules;
use crate::settings::SettingsStore;
use crate::workspaces::Workspaces;
use crate::{log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Outcome of a start or end. The persisted state is always written;
/// `issues` lists the side effects that did not complete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionReport {
    pub state: FocusState,
    pub issues: Vec<String>,
}

impl TransitionReport {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftWarning {
    pub message: String,
    pub status: FocusStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FocusStateChangedEvent<'a> {
    state: &'a FocusState,
    time_left: f64,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct FocusController {
    db: Database,
    browser: Arc<dyn BrowserSurface>,
    rules: BlockingRules,
    tracker: ContextTracker,
    parking: ParkingLot,
    workspaces: Workspaces,
    settings: Arc<SettingsStore>,
    events: EventEmitter,
    transition: Arc<Mutex<()>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
    drift_every_ticks: u32,
}

impl FocusController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        browser: Arc<dyn BrowserSurface>,
        rules: BlockingRules,
        tracker: ContextTracker,
        parking: ParkingLot,
        workspaces: Workspaces,
        settings: Arc<SettingsStore>,
        events: EventEmitter,
    ) -> Self {
        let debug_mode = std::env::var("FOCUSLENS_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let current = settings.get();

        Self {
            db,
            browser,
            rules,
            tracker,
            parking,
            workspaces,
            settings,
            events,
            transition: Arc::new(Mutex::new(())),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: if debug_mode {
                Duration::from_secs(1)
            } else {
                Duration::from_secs(current.tick_interval_secs.max(1))
            },
            drift_every_ticks: current.drift_check_every_ticks.max(1),
        }
    }

    pub async fn state(&self) -> Result<FocusState> {
        self.db.get_focus_state().await
    }

    pub async fn is_active(&self) -> Result<bool> {
        Ok(self.state().await?.active)
    }

    pub async fn is_blocked(&self, context: &str) -> Result<bool> {
        Ok(self.state().await?.is_blocked(context))
    }

    pub async fn time_left(&self) -> Result<f64> {
        Ok(self.state().await?.time_left_secs(Utc::now()))
    }

    /// INACTIVE or ACTIVE → ACTIVE. Tabs are snapshotted and collapsed
    /// before the new policy is persisted, then rules are recompiled.
    pub async fn start(
        &self,
        allowed_contexts: Vec<String>,
        duration_minutes: Option<u32>,
    ) -> Result<TransitionReport> {
        let _transition = self.transition.lock().await;
        let mut issues = Vec::new();

        match self.browser.snapshot_windows().await {
            Ok(windows) => {
                if let Err(err) = self.db.save_focus_backup(&windows).await {
                    note(&mut issues, "save tab backup", err);
                }
            }
            Err(err) => note(&mut issues, "snapshot tabs", err),
        }

        let focus_page = self.settings.get().focus_page_url;
        if let Err(err) = self.browser.collapse_to_page(&focus_page).await {
            note(&mut issues, "collapse to focus page", err);
        }

        let state = FocusState::started(allowed_contexts, duration_minutes, Utc::now());
        self.db.save_focus_state(&state).await?;

        if let Err(err) = self.rules.apply_allowed_contexts().await {
            note(&mut issues, "recompile rules", err);
        }

        log_info!(
            "Focus session started (allowed: {:?}, minutes: {:?})",
            state.allowed_contexts,
            duration_minutes
        );
        self.emit_state_changed(&state);
        Ok(TransitionReport { state, issues })
    }

    /// ACTIVE or INACTIVE → INACTIVE, optionally saving the current tab
    /// groups under `save_workspace_name` first.
    pub async fn end(&self, save_workspace_name: Option<&str>) -> Result<TransitionReport> {
        let _transition = self.transition.lock().await;
        self.end_locked(save_workspace_name).await
    }

    /// Caller holds `transition`.
    async fn end_locked(&self, save_workspace_name: Option<&str>) -> Result<TransitionReport> {
        let mut issues = Vec::new();

        if let Some(name) = save_workspace_name.filter(|name| !name.trim().is_empty()) {
            if let Err(err) = self.workspaces.save_current(name).await {
                note(&mut issues, "save workspace", err);
            }
        }

        let state = self.db.get_focus_state().await?.ended();
        self.db.save_focus_state(&state).await?;

        if let Err(err) = self.rules.apply_allowed_contexts().await {
            note(&mut issues, "recompile rules", err);
        }

        if let Err(err) = self.browser.ungroup_all().await {
            note(&mut issues, "ungroup tabs", err);
        }

        if let Err(err) = self.restore_backup().await {
            note(&mut issues, "restore tabs", err);
        }

        if let Err(err) = self.parking.release_parked_links().await {
            note(&mut issues, "release parked links", err);
        }

        log_info!("Focus session ended");
        self.emit_state_changed(&state);
        Ok(TransitionReport { state, issues })
    }

    async fn restore_backup(&self) -> Result<()> {
        let windows = self.db.get_focus_backup().await?;
        if windows.iter().all(|window| window.tabs.is_empty()) {
            return Ok(());
        }
        self.browser.restore_windows(&windows).await?;
        self.db.clear_focus_backup().await
    }

    /// Ends the session if its end time has passed.
    pub async fn check_expiry(&self) -> Result<Option<TransitionReport>> {
        if !self.state().await?.is_expired(Utc::now()) {
            return Ok(None);
        }
        let _transition = self.transition.lock().await;
        // A start may have replaced the session while we waited.
        if !self.state().await?.is_expired(Utc::now()) {
            return Ok(None);
        }
        log_info!("Focus session expired");
        self.end_locked(None).await.map(Some)
    }

    pub async fn check_focus_status(&self) -> Result<FocusStatus> {
        let settings = self.settings.focus_settings();
        self.tracker
            .check_focus_status(settings.switch_threshold, settings.time_window_minutes)
            .await
    }

    /// Emits a `drift-warning` when an active session has lost focus.
    pub async fn check_drift(&self) -> Result<Option<DriftWarning>> {
        if !self.is_active().await? {
            return Ok(None);
        }
        let status = self.check_focus_status().await?;
        if !status.is_lost_focus {
            return Ok(None);
        }

        let message = match status.context_switches.last() {
            Some(last) => format!("Focus lost: switched from {} to {}", last.from, last.to),
            None => "You're drifting from your focus task".to_string(),
        };
        let warning = DriftWarning { message, status };
        self.events.emit("drift-warning", &warning)?;
        log_warn!("{}", warning.message);
        Ok(Some(warning))
    }

    pub async fn start_ticker(&self) {
        let mut guard = self.ticker.lock().await;
        if let Some(previous) = guard.take() {
            previous.cancel.cancel();
            previous.handle.abort();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controller = self.clone();
        let handle = tokio::spawn(async move { controller.run_ticker(token).await });

        *guard = Some(Ticker { handle, cancel });
    }

    pub async fn stop_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
            if let Err(err) = ticker.handle.await {
                if !err.is_cancelled() {
                    log_error!("Focus ticker panicked: {err}");
                }
            }
        }
    }

    async fn run_ticker(&self, cancel: CancellationToken) {
        let mut interval = time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let mut ticks: u32 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            if let Err(err) = self.check_expiry().await {
                log_error!("Expiry check failed: {err:#}");
            }

            ticks = ticks.wrapping_add(1);
            if ticks % self.drift_every_ticks == 0 {
                if let Err(err) = self.check_drift().await {
                    log_error!("Drift check failed: {err:#}");
                }
            }
        }
    }

    fn emit_state_changed(&self, state: &FocusState) {
        let payload = FocusStateChangedEvent {
            state,
            time_left: state.time_left_secs(Utc::now()),
        };
        if let Err(err) = self.events.emit("focus-state-changed", payload) {
            log_warn!("Failed to emit focus-state-changed: {err:#}");
        }
    }
}

fn note(issues: &mut Vec<String>, step: &str, err: anyhow::Error) {
    log_warn!("Could not {step}: {err:#}");
    issues.push(format!("{step}: {err}"));
}
