use crate::chat_client::{ChatError, ChatPlatform};
use crate::database::DatabaseError;
use crate::jira_client::IssueTracker;
use crate::models::RenderedMessage;
use crate::renderer;
use crate::subscriptions::ProjectSubscriptionStore;
use futures_util::future::join_all;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MentionError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Chat(#[from] ChatError),
}

fn looks_like_issue_key(text: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[A-Z]+-[0-9]+").expect("issue key pattern"))
        .is_match(text)
}

/// Every `KEY-123` mention of the given projects, grouped by project in the
/// order the keys are given. Repeated mentions are kept.
pub fn scan_issue_keys(text: &str, project_keys: &[String]) -> Vec<String> {
    project_keys
        .iter()
        .filter_map(|key| Regex::new(&format!(r"{}-[0-9]+", regex::escape(key))).ok())
        .flat_map(|pattern| {
            pattern
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Answers a chat message that mentions issues of the room's connected
/// projects with one attachment per mention. Lookups that fail are left out;
/// nothing is sent when no lookup succeeds.
pub async fn handle_message(
    store: &ProjectSubscriptionStore,
    tracker: &dyn IssueTracker,
    chat: &dyn ChatPlatform,
    room_id: &str,
    text: &str,
) -> Result<Option<RenderedMessage>, MentionError> {
    if !looks_like_issue_key(text) {
        return Ok(None);
    }

    let project_keys: Vec<String> = match store.list_links(Some(room_id)).await?.into_iter().next() {
        Some(record) => record.connected_projects.into_keys().collect(),
        None => return Ok(None),
    };

    let mentioned = scan_issue_keys(text, &project_keys);
    if mentioned.is_empty() {
        return Ok(None);
    }

    let lookups = join_all(mentioned.iter().map(|key| tracker.get_issue(key))).await;
    let issues: Vec<_> = mentioned
        .iter()
        .zip(lookups)
        .filter_map(|(key, lookup)| match lookup {
            Ok(issue) => Some(issue),
            Err(e) => {
                tracing::debug!(issue = %key, error = %e, "skipping mentioned issue");
                None
            }
        })
        .collect();

    let message = match renderer::render_issues(&issues) {
        Some(message) => message,
        None => return Ok(None),
    };

    let room = match chat.find_room(room_id).await? {
        Some(room) => room,
        None => {
            tracing::warn!(room = room_id, "mention from an unknown room");
            return Ok(None);
        }
    };
    chat.send(&room, &message).await?;
    tracing::info!(room = room_id, issues = issues.len(), "answered issue mentions");
    Ok(Some(message))
}
