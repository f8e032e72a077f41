use serde::Deserialize;

use crate::focus::{FocusController, FocusState, TransitionReport};
use crate::history::FocusStatus;
use crate::AppState;

fn controller_from_state(state: &AppState) -> FocusController {
    state.focus.clone()
}

/// Either the current `allowedContexts` form or the older `blockedCategories`
/// form. When both are present the allowed list wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartFocusPayload {
    pub allowed_contexts: Option<Vec<String>>,
    pub blocked_categories: Option<Vec<String>>,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndFocusPayload {
    pub save_workspace_name: Option<String>,
}

pub async fn start_focus_session(
    state: &AppState,
    payload: StartFocusPayload,
) -> Result<TransitionReport, String> {
    let allowed = match (payload.allowed_contexts, payload.blocked_categories) {
        (Some(allowed), _) => allowed,
        (None, Some(blocked)) => state.catalog.allowed_excluding(&blocked),
        (None, None) => Vec::new(),
    };
    let controller = controller_from_state(state);
    controller
        .start(allowed, payload.duration_minutes)
        .await
        .map_err(|e| e.to_string())
}

pub async fn end_focus_session(
    state: &AppState,
    payload: EndFocusPayload,
) -> Result<TransitionReport, String> {
    let controller = controller_from_state(state);
    controller
        .end(payload.save_workspace_name.as_deref())
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_focus_time_left(state: &AppState) -> Result<f64, String> {
    let controller = controller_from_state(state);
    controller.time_left().await.map_err(|e| e.to_string())
}

pub async fn get_focus_state(state: &AppState) -> Result<FocusState, String> {
    let controller = controller_from_state(state);
    controller.state().await.map_err(|e| e.to_string())
}

pub async fn check_focus_status(state: &AppState) -> Result<FocusStatus, String> {
    let controller = controller_from_state(state);
    controller
        .check_focus_status()
        .await
        .map_err(|e| e.to_string())
}

pub async fn restore_workspace(state: &AppState, name: &str) -> Result<bool, String> {
    state
        .workspaces
        .restore(name)
        .await
        .map_err(|e| e.to_string())
}
