use crate::chat_client::ChatPlatform;
use crate::database::DatabaseError;
use crate::models::RenderedMessage;
use crate::subscriptions::ProjectSubscriptionStore;
use futures_util::future::join_all;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

enum RoomOutcome {
    Delivered(String),
    Skipped(String),
    Failed(String),
}

/// Sends one copy of `message` to every room subscribed to `project_key`.
/// Rooms are served concurrently and a bad room never stops the others;
/// the call returns once every room has been accounted for.
pub async fn deliver(
    store: &ProjectSubscriptionStore,
    chat: &dyn ChatPlatform,
    message: &RenderedMessage,
    project_key: &str,
) -> Result<DeliveryReport, DatabaseError> {
    let rooms = store.rooms_for_project(project_key).await?;
    if rooms.is_empty() {
        tracing::debug!(project = project_key, "no room is subscribed to this project");
        return Ok(DeliveryReport::default());
    }

    let outcomes = join_all(
        rooms
            .into_iter()
            .map(|room_id| deliver_to_room(chat, room_id, message)),
    )
    .await;

    let mut report = DeliveryReport::default();
    for outcome in outcomes {
        match outcome {
            RoomOutcome::Delivered(room) => report.delivered.push(room),
            RoomOutcome::Skipped(room) => report.skipped.push(room),
            RoomOutcome::Failed(room) => report.failed.push(room),
        }
    }
    tracing::info!(
        project = project_key,
        delivered = report.delivered.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "notification fan-out finished"
    );
    Ok(report)
}

async fn deliver_to_room(chat: &dyn ChatPlatform, room_id: String, message: &RenderedMessage) -> RoomOutcome {
    let room = match chat.find_room(&room_id).await {
        Ok(Some(room)) => room,
        Ok(None) => {
            tracing::warn!(room = %room_id, "invalid room id, skipping delivery");
            return RoomOutcome::Skipped(room_id);
        }
        Err(e) => {
            tracing::warn!(room = %room_id, error = %e, "could not resolve room");
            return RoomOutcome::Failed(room_id);
        }
    };

    match chat.send(&room, message).await {
        Ok(()) => RoomOutcome::Delivered(room_id),
        Err(e) => {
            tracing::warn!(room = %room_id, error = %e, "delivery failed");
            RoomOutcome::Failed(room_id)
        }
    }
}
