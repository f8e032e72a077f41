//! Newline-delimited JSON requests on the input stream, answered on the
//! shared output channel. Every request runs on its own task, so a slow
//! focus transition never holds up a navigation check.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::db::models::PageSignal;
use crate::feedback::{FeedbackEvent, FeedbackRequest};
use crate::focus::commands::{
    check_focus_status, end_focus_session, get_focus_state, get_focus_time_left,
    restore_workspace, start_focus_session, EndFocusPayload, StartFocusPayload,
};
use crate::focus::TabInfo;
use crate::navigation::{ContextUpdate, NavigationEvent};
use crate::overrides::commands::{
    add_url_pattern_override, remove_domain_context, remove_url_pattern_override,
    set_domain_context, NewUrlPatternOverride,
};
use crate::AppState;
use crate::{log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Message {
    ClassifyPage(PageSignal),
    ContextDetected(ContextUpdate),
    SubmitFeedback(FeedbackRequest),
    FeedbackSubmitted(FeedbackEvent),
    StartFocusSession(StartFocusPayload),
    EndFocusSession(EndFocusPayload),
    GetFocusTimeLeft,
    CheckFocusStatus,
    FocusStatus,
    SettingsUpdated,
    BeforeNavigate(NavigationEvent),
    TabUpdated(TabInfo),
    TabRemoved {
        tab_id: i64,
    },
    ParkLink {
        url: String,
        context: String,
        title: Option<String>,
    },
    ReleaseParkedLinks,
    RestoreWorkspace {
        name: String,
    },
    AddUrlPatternOverride(NewUrlPatternOverride),
    RemoveUrlPatternOverride {
        pattern: String,
    },
    SetDomainContext {
        domain: String,
        context: String,
    },
    RemoveDomainContext {
        domain: String,
    },
    GetFeedbackStatistics,
    ClearFeedbackHistory,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(default)]
    id: Value,
    message: Value,
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

pub async fn dispatch(state: &AppState, message: Message) -> Result<Value, String> {
    match message {
        Message::ClassifyPage(signal) => to_value(state.classifier.classify(&signal).await),
        Message::ContextDetected(update) => {
            let decision = state
                .navigation
                .handle_context_update(&update)
                .await
                .map_err(|e| e.to_string())?;
            to_value(decision)
        }
        Message::SubmitFeedback(request) => {
            let outcome = state
                .feedback
                .submit_feedback(request)
                .await
                .map_err(|e| e.to_string())?;
            to_value(outcome)
        }
        Message::FeedbackSubmitted(event) => {
            state
                .feedback
                .record_feedback(event)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({ "success": true }))
        }
        Message::StartFocusSession(payload) => to_value(start_focus_session(state, payload).await?),
        Message::EndFocusSession(payload) => to_value(end_focus_session(state, payload).await?),
        Message::GetFocusTimeLeft => to_value(get_focus_time_left(state).await?),
        Message::CheckFocusStatus => to_value(check_focus_status(state).await?),
        Message::FocusStatus => to_value(get_focus_state(state).await?),
        Message::SettingsUpdated => {
            let settings = state.settings.reload().map_err(|e| e.to_string())?;
            state
                .rules
                .apply_allowed_contexts()
                .await
                .map_err(|e| e.to_string())?;
            to_value(settings)
        }
        Message::BeforeNavigate(event) => {
            let decision = state
                .navigation
                .before_navigate(&event)
                .await
                .map_err(|e| e.to_string())?;
            to_value(decision)
        }
        Message::TabUpdated(tab) => {
            state.browser.observe_tab(tab).await;
            Ok(Value::Null)
        }
        Message::TabRemoved { tab_id } => {
            state.navigation.tab_removed(tab_id).await;
            Ok(Value::Null)
        }
        Message::ParkLink {
            url,
            context,
            title,
        } => {
            let added = state
                .parking
                .save_for_later(&url, &context, title)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({ "added": added }))
        }
        Message::ReleaseParkedLinks => {
            let opened = state
                .parking
                .release_parked_links()
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({ "opened": opened }))
        }
        Message::RestoreWorkspace { name } => {
            let restored = restore_workspace(state, &name).await?;
            Ok(json!({ "restored": restored }))
        }
        Message::AddUrlPatternOverride(entry) => {
            add_url_pattern_override(state, entry).await?;
            Ok(json!({ "success": true }))
        }
        Message::RemoveUrlPatternOverride { pattern } => {
            let removed = remove_url_pattern_override(state, &pattern).await?;
            Ok(json!({ "removed": removed }))
        }
        Message::SetDomainContext { domain, context } => {
            let written = set_domain_context(state, &domain, &context).await?;
            Ok(json!({ "written": written }))
        }
        Message::RemoveDomainContext { domain } => {
            let removed = remove_domain_context(state, &domain).await?;
            Ok(json!({ "removed": removed }))
        }
        Message::GetFeedbackStatistics => {
            to_value(state.feedback.statistics().await.map_err(|e| e.to_string())?)
        }
        Message::ClearFeedbackHistory => {
            state
                .feedback
                .clear_history()
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({ "success": true }))
        }
    }
}

/// Handles one request line and returns the response line.
pub async fn handle_line(state: &AppState, line: &str) -> String {
    let request: RawRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            log_warn!("Unreadable request: {err}");
            return json!({ "id": Value::Null, "ok": false, "error": format!("invalid request: {err}") })
                .to_string();
        }
    };

    let outcome = match serde_json::from_value::<Message>(request.message) {
        Ok(message) => dispatch(state, message).await,
        Err(err) => Err(format!("unknown or malformed message: {err}")),
    };

    match outcome {
        Ok(result) => json!({ "id": request.id, "ok": true, "result": result }),
        Err(error) => {
            log_error!("Request {} failed: {error}", request.id);
            json!({ "id": request.id, "ok": false, "error": error })
        }
    }
    .to_string()
}

/// Reads requests until end of input. Responses go out through the state's
/// event channel in completion order.
pub async fn serve<R>(state: AppState, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read request line")?
    {
        if line.trim().is_empty() {
            continue;
        }
        let state = state.clone();
        tokio::spawn(async move {
            let response = handle_line(&state, &line).await;
            state.events.send_line(response);
        });
    }
    log_info!("Input closed; no more requests");
    Ok(())
}
