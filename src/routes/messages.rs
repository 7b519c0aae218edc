use crate::mentions;
use crate::AppState;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub room_id: String,
    pub text: String,
}

/// Chat messages are fire-and-forget from the sender's point of view, so
/// failures are logged and the request still succeeds.
pub async fn message(
    axum::extract::State(state): axum::extract::State<AppState>,
    axum::Json(message): axum::Json<InboundMessage>,
) -> axum::http::StatusCode {
    let Some(tracker) = state.tracker.as_deref() else {
        tracing::debug!(room = %message.room_id, "ignoring message, Jira is not configured");
        return axum::http::StatusCode::OK;
    };

    if let Err(e) = mentions::handle_message(
        &state.store,
        tracker,
        state.chat.as_ref(),
        &message.room_id,
        &message.text,
    )
    .await
    {
        tracing::error!(room = %message.room_id, error = %e, "could not answer issue mentions");
    }
    axum::http::StatusCode::OK
}
