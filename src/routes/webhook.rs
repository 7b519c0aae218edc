use crate::classifier::{classify, NotificationIntent};
use crate::fanout::{self, DeliveryReport};
use crate::renderer::render;
use crate::AppState;

/// Jira retries non-2xx deliveries, so every outcome is answered with 200
/// once it has been logged.
pub async fn webhook(
    axum::extract::State(state): axum::extract::State<AppState>,
    body: axum::body::Bytes,
) -> axum::http::StatusCode {
    if let Err(e) = process(&state, &body).await {
        tracing::error!(error = %e, "webhook delivery failed");
    }
    axum::http::StatusCode::OK
}

async fn process(state: &AppState, body: &[u8]) -> Result<Option<DeliveryReport>, crate::database::DatabaseError> {
    let raw: serde_json::Value = match serde_json::from_slice(body) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "webhook body is not JSON");
            return Ok(None);
        }
    };

    let intent = classify(&raw);
    match &intent {
        NotificationIntent::Unrecognized { reason } => {
            tracing::warn!(reason = %reason, "unrecognized webhook");
            return Ok(None);
        }
        NotificationIntent::Suppressed { event } => {
            tracing::debug!(event = %event, "suppressed webhook");
            return Ok(None);
        }
        _ => {}
    }

    let (Some(project_key), Some(message)) = (intent.project_key(), render(&intent)) else {
        return Ok(None);
    };
    tracing::debug!(kind = intent.kind(), project = project_key, "dispatching notification");
    fanout::deliver(&state.store, state.chat.as_ref(), &message, project_key)
        .await
        .map(Some)
}
