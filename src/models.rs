use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Deserialize, Debug, Clone)]
pub struct JiraUser {
    pub name: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NamedField {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JiraProjectRef {
    pub key: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JiraAttachment {
    pub filename: String,
    pub thumbnail: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JiraIssue {
    pub key: String,
    #[serde(rename = "self")]
    pub self_url: String,
    pub fields: JiraIssueFields,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JiraIssueFields {
    pub summary: String,
    pub description: Option<String>,
    pub issuetype: NamedField,
    pub status: NamedField,
    pub priority: Option<NamedField>,
    pub assignee: Option<JiraUser>,
    pub project: JiraProjectRef,
    pub attachment: Option<Vec<JiraAttachment>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JiraProject {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(rename = "self")]
    pub self_url: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JiraComment {
    pub id: String,
    pub body: Option<String>,
    #[serde(rename = "updateAuthor")]
    pub update_author: Option<JiraUser>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChangelogItem {
    pub field: String,
    #[serde(rename = "fromString")]
    pub from_string: Option<String>,
    #[serde(rename = "toString")]
    pub to_string: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Changelog {
    #[serde(default)]
    pub items: Vec<ChangelogItem>,
}

/// Inbound webhook body. Only the discriminators are optional at the type
/// level; a present `issue` must carry the full field set or the whole
/// payload is rejected.
#[derive(Deserialize, Debug, Clone)]
pub struct WebhookPayload {
    #[serde(rename = "webhookEvent")]
    pub webhook_event: Option<String>,
    pub issue_event_type_name: Option<String>,
    pub issue: Option<JiraIssue>,
    pub user: Option<JiraUser>,
    pub comment: Option<JiraComment>,
    pub changelog: Option<Changelog>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailSource {
    pub filename: String,
    pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub key: String,
    pub self_url: String,
    pub summary: String,
    pub type_name: String,
    pub status_name: String,
    pub priority_name: Option<String>,
    pub assignee: Option<String>,
    pub project_key: String,
    pub description: Option<String>,
    pub attachments: Vec<ThumbnailSource>,
}

impl IssueRef {
    pub fn browse_url(&self) -> String {
        format!("{}/browse/{}", base_url_from_self(&self.self_url), self.key)
    }
}

impl From<JiraIssue> for IssueRef {
    fn from(issue: JiraIssue) -> Self {
        let fields = issue.fields;
        let attachments = fields
            .attachment
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                a.thumbnail.map(|thumbnail| ThumbnailSource {
                    filename: a.filename,
                    thumbnail,
                })
            })
            .collect();

        Self {
            key: issue.key,
            self_url: issue.self_url,
            summary: fields.summary,
            type_name: fields.issuetype.name,
            status_name: fields.status.name,
            priority_name: fields.priority.map(|p| p.name),
            assignee: fields
                .assignee
                .and_then(|a| a.display_name.or(a.name)),
            project_key: fields.project.key,
            description: fields.description,
            attachments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub field: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
}

impl From<ChangelogItem> for ChangelogEntry {
    fn from(item: ChangelogItem) -> Self {
        Self {
            field: item.field,
            from_value: item.from_string,
            to_value: item.to_string,
        }
    }
}

/// A project connected to a room, stored as `{ id, self, key, name }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectLink {
    #[serde(rename = "key")]
    pub project_key: String,
    #[serde(rename = "id")]
    pub project_id: String,
    #[serde(rename = "self")]
    pub self_url: String,
    pub name: String,
}

impl ProjectLink {
    pub fn browse_url(&self) -> String {
        format!("{}/browse/{}", base_url_from_self(&self.self_url), self.project_key)
    }
}

impl From<&JiraProject> for ProjectLink {
    fn from(project: &JiraProject) -> Self {
        Self {
            project_key: project.key.to_uppercase(),
            project_id: project.id.clone(),
            self_url: project.self_url.clone(),
            name: project.name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomProjects {
    pub room: String,
    #[serde(rename = "connectedProjects", default)]
    pub connected_projects: BTreeMap<String, ProjectLink>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub base_url: String,
    pub authorization: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WebhookRegistration {
    #[serde(rename = "self")]
    pub self_url: String,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub filters: Option<serde_json::Value>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentField {
    pub label: String,
    pub value: String,
    pub is_short: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub title_text: String,
    pub title_link: String,
    pub body_text: Option<String>,
    pub fields: Vec<AttachmentField>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedMessage {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl RenderedMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }
}

/// Cuts a Jira REST `self` URL down to the instance base URL.
pub fn base_url_from_self(self_url: &str) -> &str {
    match self_url.find("/rest") {
        Some(index) => &self_url[..index],
        None => self_url.trim_end_matches('/'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_cut_at_rest_segment() {
        assert_eq!(
            base_url_from_self("https://jira.example.com/rest/api/2/issue/10"),
            "https://jira.example.com"
        );
        assert_eq!(base_url_from_self("https://h/"), "https://h");
    }

    #[test]
    fn issue_ref_prefers_display_name_and_keeps_thumbnails() {
        let issue: JiraIssue = serde_json::from_value(serde_json::json!({
            "key": "FOO-1",
            "self": "https://h/rest/api/2/issue/10",
            "fields": {
                "summary": "S",
                "issuetype": { "name": "Bug" },
                "status": { "name": "Open" },
                "priority": { "name": "High" },
                "assignee": { "name": "bob", "displayName": "Bob" },
                "project": { "key": "FOO" },
                "attachment": [
                    { "filename": "a.png", "thumbnail": "https://h/thumb/a" },
                    { "filename": "b.txt" }
                ]
            }
        }))
        .unwrap();

        let issue = IssueRef::from(issue);
        assert_eq!(issue.assignee.as_deref(), Some("Bob"));
        assert_eq!(issue.priority_name.as_deref(), Some("High"));
        assert_eq!(issue.attachments.len(), 1);
        assert_eq!(issue.browse_url(), "https://h/browse/FOO-1");
    }

    #[test]
    fn project_link_uses_stored_field_names() {
        let link = ProjectLink {
            project_key: "FOO".to_string(),
            project_id: "1".to_string(),
            self_url: "https://h/rest/api/2/project/1".to_string(),
            name: "Foo".to_string(),
        };
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(value["key"], "FOO");
        assert_eq!(value["self"], "https://h/rest/api/2/project/1");
        assert_eq!(link.browse_url(), "https://h/browse/FOO");
    }
}
