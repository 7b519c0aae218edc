use crate::models::*;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

const ISSUE_FIELDS: &str = "summary,attachment,status,assignee,priority,project,issuetype,description";
const WEBHOOK_NAME: &str = "Chat Bridge Webhook";
const WEBHOOK_EVENTS: [&str; 4] = [
    "jira:issue_created",
    "jira:issue_updated",
    "comment_created",
    "comment_updated",
];

#[derive(Error, Debug)]
pub enum JiraError {
    #[error("Not found in Jira: {0}")]
    NotFound(String),
    #[error("Jira responded with {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Jira request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid Jira authorization header")]
    InvalidAuthorization,
    #[error("No Jira installation is configured")]
    MissingInstallation,
}

/// Read-only view of the issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<JiraProject>, JiraError>;
    async fn get_project(&self, key: &str) -> Result<JiraProject, JiraError>;
    async fn get_issue(&self, key: &str) -> Result<IssueRef, JiraError>;
}

pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
}

impl JiraClient {
    pub fn new(installation: &Installation) -> Result<Self, JiraError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            installation
                .authorization
                .parse()
                .map_err(|_| JiraError::InvalidAuthorization)?,
        );

        Ok(Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .build()?,
            base_url: installation.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn _get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, JiraError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let value: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        if let Some(message) = error_message(&value) {
            return Err(JiraError::NotFound(message));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(JiraError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(JiraError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_value(value)
            .map_err(|e| JiraError::NotFound(format!("unexpected response for {}: {}", path, e)))
    }

    /// Registers `url` as the receiver of issue and comment events.
    pub async fn register_webhook(&self, url: &str) -> Result<WebhookRegistration, JiraError> {
        let response = self
            .client
            .post(format!("{}/rest/webhooks/1.0/webhook", self.base_url))
            .json(&serde_json::json!({
                "name": WEBHOOK_NAME,
                "url": url,
                "excludeBody": false,
                "events": WEBHOOK_EVENTS,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(JiraError::Upstream {
                status: status.as_u16(),
                body: response.text().await?,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn list_projects(&self) -> Result<Vec<JiraProject>, JiraError> {
        self._get("/rest/api/2/project?expand=description").await
    }

    async fn get_project(&self, key: &str) -> Result<JiraProject, JiraError> {
        if !is_project_key(key) {
            return Err(JiraError::NotFound(key.to_string()));
        }
        self._get(&format!(
            "/rest/api/2/project/{}?expand=description",
            key.to_uppercase()
        ))
        .await
    }

    async fn get_issue(&self, key: &str) -> Result<IssueRef, JiraError> {
        if !is_issue_key(key) {
            return Err(JiraError::NotFound(key.to_string()));
        }
        let issue: JiraIssue = self
            ._get(&format!("/rest/api/2/issue/{}?fields={}", key, ISSUE_FIELDS))
            .await?;
        Ok(IssueRef::from(issue))
    }
}

/// Jira answers failed reads with `{ "errorMessages": [..], "errors": {..} }`.
fn error_message(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    if !object.contains_key("errorMessages") && !object.contains_key("errors") {
        return None;
    }
    let messages = object
        .get("errorMessages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default();
    Some(if messages.is_empty() {
        "error response".to_string()
    } else {
        messages
    })
}

pub fn is_project_key(key: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("project key pattern"))
        .is_match(key)
}

pub fn is_issue_key(key: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*-[0-9]+$").expect("issue key pattern"))
        .is_match(key)
}
