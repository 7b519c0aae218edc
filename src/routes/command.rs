use crate::commands::{self, Command, CommandError};
use crate::jira_client::JiraError;
use crate::models::RenderedMessage;
use crate::AppState;
use axum::response::IntoResponse;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub room_id: String,
    #[serde(default)]
    pub args: Vec<String>,
}

pub async fn command(
    axum::extract::State(state): axum::extract::State<AppState>,
    axum::Json(request): axum::Json<CommandRequest>,
) -> Result<axum::Json<RenderedMessage>, CommandError> {
    let tracker = state.tracker.as_deref().ok_or(JiraError::MissingInstallation)?;
    let reply = commands::execute(
        &state.store,
        tracker,
        &request.room_id,
        Command::parse(&request.args),
    )
    .await?;
    Ok(axum::Json(reply))
}

impl IntoResponse for CommandError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            CommandError::Jira(JiraError::MissingInstallation) => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            CommandError::Jira(_) => axum::http::StatusCode::BAD_GATEWAY,
            CommandError::Database(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, status = status.as_u16(), "slash command failed");
        (status, self.to_string()).into_response()
    }
}
