use crate::AppState;

pub async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "jira": state.tracker.is_some(),
    }))
}
