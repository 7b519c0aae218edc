use crate::models::{ChangelogEntry, IssueRef, JiraUser, WebhookPayload};
use serde_json::Value;

pub const WEBHOOK_ISSUE_CREATED: &str = "jira:issue_created";
pub const WEBHOOK_ISSUE_UPDATED: &str = "jira:issue_updated";

pub const EVENT_ISSUE_UPDATED: &str = "issue_updated";
pub const EVENT_ISSUE_ASSIGNED: &str = "issue_assigned";
pub const EVENT_ISSUE_GENERIC: &str = "issue_generic";
pub const EVENT_COMMENT_CREATED: &str = "issue_commented";
pub const EVENT_COMMENT_EDITED: &str = "issue_comment_edited";

pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRef {
    pub id: String,
    pub body: Option<String>,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationIntent {
    IssueCreated {
        issue: IssueRef,
        actor: String,
    },
    IssueStatusChanged {
        issue: IssueRef,
        actor: String,
        from: Option<String>,
        to: Option<String>,
    },
    IssueAssigneeChanged {
        issue: IssueRef,
        actor: String,
        from: Option<String>,
        to: String,
    },
    CommentCreated {
        issue: IssueRef,
        comment: CommentRef,
    },
    CommentEdited {
        issue: IssueRef,
        comment: CommentRef,
    },
    /// A known issue event that carries nothing worth announcing, such as a
    /// priority edit.
    Suppressed { event: String },
    Unrecognized { reason: String },
}

impl NotificationIntent {
    pub fn issue(&self) -> Option<&IssueRef> {
        match self {
            Self::IssueCreated { issue, .. }
            | Self::IssueStatusChanged { issue, .. }
            | Self::IssueAssigneeChanged { issue, .. }
            | Self::CommentCreated { issue, .. }
            | Self::CommentEdited { issue, .. } => Some(issue),
            Self::Suppressed { .. } | Self::Unrecognized { .. } => None,
        }
    }

    pub fn project_key(&self) -> Option<&str> {
        self.issue().map(|issue| issue.project_key.as_str())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::IssueCreated { .. } => "issue_created",
            Self::IssueStatusChanged { .. } => "issue_status_changed",
            Self::IssueAssigneeChanged { .. } => "issue_assignee_changed",
            Self::CommentCreated { .. } => "comment_created",
            Self::CommentEdited { .. } => "comment_edited",
            Self::Suppressed { .. } => "suppressed",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

fn unrecognized(reason: impl Into<String>) -> NotificationIntent {
    NotificationIntent::Unrecognized {
        reason: reason.into(),
    }
}

/// Maps a raw webhook body to the notification it should produce.
/// Never fails: shapes it cannot read come back as `Unrecognized`.
pub fn classify(raw: &Value) -> NotificationIntent {
    match serde_json::from_value::<WebhookPayload>(raw.clone()) {
        Ok(payload) => classify_payload(payload),
        Err(e) => unrecognized(format!("invalid payload shape: {}", e)),
    }
}

pub fn classify_payload(payload: WebhookPayload) -> NotificationIntent {
    let webhook_event = match payload.webhook_event.as_deref() {
        Some(event) => event.to_string(),
        None => return unrecognized("missing webhookEvent"),
    };
    let sub_event = payload.issue_event_type_name.clone().unwrap_or_default();

    let issue = match (webhook_event.as_str(), payload.issue) {
        (WEBHOOK_ISSUE_CREATED | WEBHOOK_ISSUE_UPDATED, Some(issue)) => IssueRef::from(issue),
        (WEBHOOK_ISSUE_CREATED | WEBHOOK_ISSUE_UPDATED, None) => {
            return unrecognized(format!("{} without an issue", webhook_event))
        }
        _ => return unrecognized(format!("unknown webhookEvent {}", webhook_event)),
    };

    let changelog: Vec<ChangelogEntry> = payload
        .changelog
        .map(|c| c.items.into_iter().map(ChangelogEntry::from).collect())
        .unwrap_or_default();

    match (webhook_event.as_str(), sub_event.as_str()) {
        (WEBHOOK_ISSUE_CREATED, _) => match actor_name(payload.user.as_ref()) {
            Some(actor) => NotificationIntent::IssueCreated { issue, actor },
            None => unrecognized("issue created without a user"),
        },
        (WEBHOOK_ISSUE_UPDATED, EVENT_COMMENT_CREATED | EVENT_COMMENT_EDITED) => {
            let comment = match payload.comment {
                Some(comment) => comment,
                None => return unrecognized(format!("{} without a comment", sub_event)),
            };
            let author = match actor_name(comment.update_author.as_ref()) {
                Some(author) => author,
                None => return unrecognized("comment without an author"),
            };
            let comment = CommentRef {
                id: comment.id,
                body: comment.body,
                author,
            };
            if sub_event == EVENT_COMMENT_CREATED {
                NotificationIntent::CommentCreated { issue, comment }
            } else {
                NotificationIntent::CommentEdited { issue, comment }
            }
        }
        (WEBHOOK_ISSUE_UPDATED, EVENT_ISSUE_UPDATED | EVENT_ISSUE_ASSIGNED | EVENT_ISSUE_GENERIC) => {
            let actor = match actor_name(payload.user.as_ref()) {
                Some(actor) => actor,
                None => return unrecognized(format!("{} without a user", sub_event)),
            };
            if let Some(status) = last_change(&changelog, "status") {
                return NotificationIntent::IssueStatusChanged {
                    issue,
                    actor,
                    from: status.from_value.clone(),
                    to: status.to_value.clone(),
                };
            }
            if sub_event != EVENT_ISSUE_GENERIC {
                if let Some(assignee) = last_change(&changelog, "assignee") {
                    return NotificationIntent::IssueAssigneeChanged {
                        issue,
                        actor,
                        from: assignee.from_value.clone(),
                        to: assignee
                            .to_value
                            .clone()
                            .unwrap_or_else(|| UNASSIGNED.to_string()),
                    };
                }
            }
            NotificationIntent::Suppressed {
                event: sub_event.clone(),
            }
        }
        _ => unrecognized(format!(
            "unknown issue event {} for {}",
            if sub_event.is_empty() { "<none>" } else { sub_event.as_str() },
            webhook_event
        )),
    }
}

fn actor_name(user: Option<&JiraUser>) -> Option<String> {
    user.and_then(|u| u.display_name.clone().or_else(|| u.name.clone()))
}

/// Later changelog entries for the same field win.
fn last_change<'a>(changelog: &'a [ChangelogEntry], field: &str) -> Option<&'a ChangelogEntry> {
    changelog.iter().rev().find(|entry| entry.field == field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_json() -> Value {
        json!({
            "key": "FOO-1",
            "self": "https://h/rest/api/2/issue/10",
            "fields": {
                "summary": "S",
                "issuetype": { "name": "Bug" },
                "status": { "name": "Open" },
                "project": { "key": "FOO" }
            }
        })
    }

    fn updated(sub: &str, items: Value) -> Value {
        json!({
            "webhookEvent": WEBHOOK_ISSUE_UPDATED,
            "issue_event_type_name": sub,
            "issue": issue_json(),
            "user": { "displayName": "Alice" },
            "changelog": { "items": items }
        })
    }

    #[test]
    fn missing_or_unknown_discriminator_is_unrecognized() {
        assert_eq!(classify(&json!({})).kind(), "unrecognized");
        assert_eq!(
            classify(&json!({ "webhookEvent": "jira:worklog_updated", "issue": issue_json() })).kind(),
            "unrecognized"
        );
        assert_eq!(classify(&json!("not an object")).kind(), "unrecognized");
        assert_eq!(classify(&json!({ "webhookEvent": 42 })).kind(), "unrecognized");
    }

    #[test]
    fn issue_with_broken_shape_is_unrecognized() {
        let payload = json!({
            "webhookEvent": WEBHOOK_ISSUE_CREATED,
            "issue": { "key": "FOO-1" },
            "user": { "displayName": "Alice" }
        });
        assert_eq!(classify(&payload).kind(), "unrecognized");
    }

    #[test]
    fn created_event_carries_actor_and_issue() {
        let payload = json!({
            "webhookEvent": WEBHOOK_ISSUE_CREATED,
            "issue_event_type_name": "issue_created",
            "issue": issue_json(),
            "user": { "displayName": "Alice" }
        });
        match classify(&payload) {
            NotificationIntent::IssueCreated { issue, actor } => {
                assert_eq!(actor, "Alice");
                assert_eq!(issue.key, "FOO-1");
                assert_eq!(issue.project_key, "FOO");
            }
            other => panic!("unexpected intent {:?}", other),
        }
    }

    #[test]
    fn status_change_wins_over_assignee_change() {
        let payload = updated(
            EVENT_ISSUE_UPDATED,
            json!([
                { "field": "assignee", "fromString": null, "toString": "Bob" },
                { "field": "status", "fromString": "Open", "toString": "Done" }
            ]),
        );
        match classify(&payload) {
            NotificationIntent::IssueStatusChanged { from, to, actor, .. } => {
                assert_eq!(actor, "Alice");
                assert_eq!(from.as_deref(), Some("Open"));
                assert_eq!(to.as_deref(), Some("Done"));
            }
            other => panic!("unexpected intent {:?}", other),
        }
    }

    #[test]
    fn last_status_entry_wins() {
        let payload = updated(
            EVENT_ISSUE_GENERIC,
            json!([
                { "field": "status", "fromString": "Open", "toString": "In Progress" },
                { "field": "status", "fromString": "In Progress", "toString": "Done" }
            ]),
        );
        match classify(&payload) {
            NotificationIntent::IssueStatusChanged { from, to, .. } => {
                assert_eq!(from.as_deref(), Some("In Progress"));
                assert_eq!(to.as_deref(), Some("Done"));
            }
            other => panic!("unexpected intent {:?}", other),
        }
    }

    #[test]
    fn last_assignee_entry_wins() {
        let payload = updated(
            EVENT_ISSUE_ASSIGNED,
            json!([
                { "field": "assignee", "fromString": null, "toString": "Bob" },
                { "field": "assignee", "fromString": "Bob", "toString": "Carol" }
            ]),
        );
        match classify(&payload) {
            NotificationIntent::IssueAssigneeChanged { from, to, .. } => {
                assert_eq!(from.as_deref(), Some("Bob"));
                assert_eq!(to, "Carol");
            }
            other => panic!("unexpected intent {:?}", other),
        }
    }

    #[test]
    fn created_event_ignores_the_sub_event() {
        for sub_event in [None, Some("issue_generic"), Some("something_else")] {
            let mut payload = json!({
                "webhookEvent": WEBHOOK_ISSUE_CREATED,
                "issue": issue_json(),
                "user": { "displayName": "Alice" }
            });
            if let Some(sub_event) = sub_event {
                payload["issue_event_type_name"] = json!(sub_event);
            }
            assert_eq!(classify(&payload).kind(), "issue_created", "sub-event {:?}", sub_event);
        }
    }

    #[test]
    fn cleared_assignee_maps_to_unassigned() {
        let payload = updated(
            EVENT_ISSUE_ASSIGNED,
            json!([{ "field": "assignee", "fromString": "Bob", "toString": null }]),
        );
        match classify(&payload) {
            NotificationIntent::IssueAssigneeChanged { from, to, .. } => {
                assert_eq!(from.as_deref(), Some("Bob"));
                assert_eq!(to, UNASSIGNED);
            }
            other => panic!("unexpected intent {:?}", other),
        }
    }

    #[test]
    fn unrelated_changes_are_suppressed() {
        let priority = updated(
            EVENT_ISSUE_UPDATED,
            json!([{ "field": "priority", "fromString": "Low", "toString": "High" }]),
        );
        assert_eq!(classify(&priority).kind(), "suppressed");

        let generic_assignee = updated(
            EVENT_ISSUE_GENERIC,
            json!([{ "field": "assignee", "fromString": null, "toString": "Bob" }]),
        );
        assert_eq!(classify(&generic_assignee).kind(), "suppressed");

        let no_changelog = json!({
            "webhookEvent": WEBHOOK_ISSUE_UPDATED,
            "issue_event_type_name": EVENT_ISSUE_UPDATED,
            "issue": issue_json(),
            "user": { "displayName": "Alice" }
        });
        assert_eq!(classify(&no_changelog).kind(), "suppressed");
    }

    #[test]
    fn comment_events_use_update_author() {
        let mut payload = json!({
            "webhookEvent": WEBHOOK_ISSUE_UPDATED,
            "issue_event_type_name": EVENT_COMMENT_CREATED,
            "issue": issue_json(),
            "comment": { "id": "100", "body": "-x-", "updateAuthor": { "displayName": "Carol" } }
        });
        match classify(&payload) {
            NotificationIntent::CommentCreated { comment, .. } => {
                assert_eq!(comment.author, "Carol");
                assert_eq!(comment.id, "100");
            }
            other => panic!("unexpected intent {:?}", other),
        }

        payload["issue_event_type_name"] = json!(EVENT_COMMENT_EDITED);
        assert_eq!(classify(&payload).kind(), "comment_edited");

        payload.as_object_mut().unwrap().remove("comment");
        assert_eq!(classify(&payload).kind(), "unrecognized");
    }

    #[test]
    fn unknown_sub_event_is_unrecognized() {
        let payload = updated("issue_worklog_updated", json!([]));
        assert_eq!(classify(&payload).kind(), "unrecognized");

        let missing_user = json!({
            "webhookEvent": WEBHOOK_ISSUE_UPDATED,
            "issue_event_type_name": EVENT_ISSUE_UPDATED,
            "issue": issue_json(),
            "changelog": { "items": [{ "field": "status", "toString": "Done" }] }
        });
        assert_eq!(classify(&missing_user).kind(), "unrecognized");
    }
}
