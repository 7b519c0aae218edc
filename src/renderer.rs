use crate::classifier::{CommentRef, NotificationIntent, UNASSIGNED};
use crate::markup;
use crate::models::{base_url_from_self, Attachment, AttachmentField, IssueRef, RenderedMessage};

const COMMENT_TAB_PANEL: &str = "com.atlassian.jira.plugin.system.issuetabpanels%3Acomment-tabpanel";

/// Renders the chat message for a classified webhook. Suppressed and
/// unrecognized intents render nothing.
pub fn render(intent: &NotificationIntent) -> Option<RenderedMessage> {
    let (text, attachment) = match intent {
        NotificationIntent::IssueCreated { issue, actor } => (
            format!(
                "*{}* created a `{}` in `{}` assigned to *{}*",
                actor,
                issue.type_name,
                issue.status_name,
                issue.assignee.as_deref().unwrap_or(UNASSIGNED)
            ),
            issue_title_attachment(issue),
        ),
        NotificationIntent::IssueStatusChanged {
            issue,
            actor,
            from,
            to,
        } => (
            format!(
                "*{}* transitioned a `{}` from `{}` to `{}`",
                actor,
                issue.type_name,
                from.as_deref().unwrap_or("None"),
                to.as_deref().unwrap_or("None")
            ),
            issue_title_attachment(issue),
        ),
        NotificationIntent::IssueAssigneeChanged { issue, actor, to, .. } => (
            format!(
                "*{}* assigned a `{}` in `{}` to *{}*",
                actor, issue.type_name, issue.status_name, to
            ),
            issue_title_attachment(issue),
        ),
        NotificationIntent::CommentCreated { issue, comment } => (
            format!(
                "*{}* commented on a `{}` in `{}`",
                comment.author, issue.type_name, issue.status_name
            ),
            comment_attachment(issue, comment),
        ),
        NotificationIntent::CommentEdited { issue, comment } => (
            format!(
                "*{}* edited a comment on a `{}` in `{}`",
                comment.author, issue.type_name, issue.status_name
            ),
            comment_attachment(issue, comment),
        ),
        NotificationIntent::Suppressed { .. } | NotificationIntent::Unrecognized { .. } => {
            return None
        }
    };

    Some(RenderedMessage {
        text,
        attachments: vec![attachment],
    })
}

/// One message with one detailed attachment per issue, in the given order.
pub fn render_issues(issues: &[IssueRef]) -> Option<RenderedMessage> {
    if issues.is_empty() {
        return None;
    }
    Some(RenderedMessage {
        text: String::new(),
        attachments: issues.iter().map(issue_detail_attachment).collect(),
    })
}

pub fn issue_detail_attachment(issue: &IssueRef) -> Attachment {
    let body = markup::translate(issue.description.as_deref(), Some(issue.attachments.as_slice()));
    Attachment {
        title_text: format!("{} - {}", issue.key, issue.summary),
        title_link: issue.browse_url(),
        body_text: Some(body).filter(|b| !b.is_empty()),
        fields: vec![
            short_field("Status", format!("`{}`", issue.status_name)),
            short_field(
                "Priority",
                format!("`{}`", issue.priority_name.as_deref().unwrap_or("None")),
            ),
            short_field("Type", format!("`{}`", issue.type_name)),
            short_field(
                "Assignee",
                issue.assignee.clone().unwrap_or_else(|| UNASSIGNED.to_string()),
            ),
        ],
    }
}

fn issue_title_attachment(issue: &IssueRef) -> Attachment {
    Attachment {
        title_text: format!("{}: {}", issue.key, issue.summary),
        title_link: issue.browse_url(),
        body_text: None,
        fields: Vec::new(),
    }
}

fn comment_attachment(issue: &IssueRef, comment: &CommentRef) -> Attachment {
    Attachment {
        title_text: format!("{}: {}", issue.key, issue.summary),
        title_link: format!(
            "{}/browse/{}?focusedCommentId={}&page={}#comment-{}",
            base_url_from_self(&issue.self_url),
            issue.key,
            comment.id,
            COMMENT_TAB_PANEL,
            comment.id
        ),
        body_text: Some(markup::translate(comment.body.as_deref(), None)),
        fields: Vec::new(),
    }
}

fn short_field(label: &str, value: String) -> AttachmentField {
    AttachmentField {
        label: label.to_string(),
        value,
        is_short: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue() -> IssueRef {
        IssueRef {
            key: "FOO-1".to_string(),
            self_url: "https://h/rest/api/2/issue/10".to_string(),
            summary: "S".to_string(),
            type_name: "Bug".to_string(),
            status_name: "Open".to_string(),
            priority_name: Some("High".to_string()),
            assignee: None,
            project_key: "FOO".to_string(),
            description: Some("h1. Steps".to_string()),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn created_issue_names_actor_type_status_and_assignee() {
        let message = render(&NotificationIntent::IssueCreated {
            issue: issue(),
            actor: "Alice".to_string(),
        })
        .unwrap();

        assert_eq!(
            message.text,
            "*Alice* created a `Bug` in `Open` assigned to *Unassigned*"
        );
        assert_eq!(message.attachments.len(), 1);
        let attachment = &message.attachments[0];
        assert_eq!(attachment.title_text, "FOO-1: S");
        assert_eq!(attachment.title_link, "https://h/browse/FOO-1");
        assert_eq!(attachment.body_text, None);
    }

    #[test]
    fn transitions_and_assignments_show_before_and_after() {
        let transitioned = render(&NotificationIntent::IssueStatusChanged {
            issue: issue(),
            actor: "Alice".to_string(),
            from: Some("Open".to_string()),
            to: Some("Done".to_string()),
        })
        .unwrap();
        assert_eq!(
            transitioned.text,
            "*Alice* transitioned a `Bug` from `Open` to `Done`"
        );

        let assigned = render(&NotificationIntent::IssueAssigneeChanged {
            issue: issue(),
            actor: "Alice".to_string(),
            from: None,
            to: "Bob".to_string(),
        })
        .unwrap();
        assert_eq!(assigned.text, "*Alice* assigned a `Bug` in `Open` to *Bob*");
    }

    #[test]
    fn comment_attachment_links_comment_and_translates_body() {
        let comment = CommentRef {
            id: "77".to_string(),
            body: Some("{{cargo test}} is -broken-".to_string()),
            author: "Carol".to_string(),
        };
        let message = render(&NotificationIntent::CommentEdited {
            issue: issue(),
            comment,
        })
        .unwrap();

        assert_eq!(message.text, "*Carol* edited a comment on a `Bug` in `Open`");
        let attachment = &message.attachments[0];
        assert!(attachment
            .title_link
            .starts_with("https://h/browse/FOO-1?focusedCommentId=77&page="));
        assert!(attachment.title_link.ends_with("#comment-77"));
        assert_eq!(
            attachment.body_text.as_deref(),
            Some("`cargo test` is ~broken~")
        );
    }

    #[test]
    fn suppressed_and_unrecognized_render_nothing() {
        assert!(render(&NotificationIntent::Suppressed {
            event: "issue_updated".to_string()
        })
        .is_none());
        assert!(render(&NotificationIntent::Unrecognized {
            reason: "x".to_string()
        })
        .is_none());
    }

    #[test]
    fn issue_details_carry_short_fields() {
        let message = render_issues(&[issue()]).unwrap();
        assert!(message.text.is_empty());

        let attachment = &message.attachments[0];
        assert_eq!(attachment.title_text, "FOO-1 - S");
        assert_eq!(attachment.body_text.as_deref(), Some("*Steps*"));
        let values: Vec<_> = attachment
            .fields
            .iter()
            .map(|f| (f.label.as_str(), f.value.as_str(), f.is_short))
            .collect();
        assert_eq!(
            values,
            vec![
                ("Status", "`Open`", true),
                ("Priority", "`High`", true),
                ("Type", "`Bug`", true),
                ("Assignee", "Unassigned", true),
            ]
        );
        assert!(render_issues(&[]).is_none());
    }
}
