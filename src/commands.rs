//! `/jira-server` slash command: connect and disconnect projects, look up
//! single issues. Replies go back to the invoking user only.

use crate::database::DatabaseError;
use crate::jira_client::{is_issue_key, IssueTracker, JiraError};
use crate::models::{base_url_from_self, Attachment, JiraProject, ProjectLink, RenderedMessage};
use crate::renderer;
use crate::subscriptions::ProjectSubscriptionStore;
use itertools::Itertools;
use thiserror::Error;

pub const COMMAND: &str = "jira-server";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Jira(#[from] JiraError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListConnectable,
    Connect(String),
    ListConnected,
    Disconnect(String),
    Lookup(String),
    Usage,
}

impl Command {
    pub fn parse(args: &[String]) -> Self {
        let first = match args.first().map(|a| a.trim()) {
            Some(first) if !first.is_empty() => first,
            _ => return Command::Usage,
        };
        let argument = args.get(1).map(|a| a.trim()).filter(|a| !a.is_empty());

        match (first.to_lowercase().as_str(), argument) {
            ("connect", Some(key)) => Command::Connect(key.to_string()),
            ("connect", None) => Command::ListConnectable,
            ("disconnect", Some(key)) => Command::Disconnect(key.to_string()),
            ("disconnect", None) => Command::ListConnected,
            ("help" | "install", _) => Command::Usage,
            _ if is_issue_key(first) => Command::Lookup(first.to_string()),
            _ => Command::Usage,
        }
    }
}

pub async fn execute(
    store: &ProjectSubscriptionStore,
    tracker: &dyn IssueTracker,
    room_id: &str,
    command: Command,
) -> Result<RenderedMessage, CommandError> {
    tracing::debug!(room = room_id, command = ?command, "running slash command");
    match command {
        Command::ListConnectable => list_connectable(store, tracker, room_id).await,
        Command::Connect(key) => connect(store, tracker, room_id, &key).await,
        Command::ListConnected => list_connected(store, room_id).await,
        Command::Disconnect(key) => disconnect(store, room_id, &key).await,
        Command::Lookup(key) => lookup(store, tracker, &key).await,
        Command::Usage => Ok(RenderedMessage::text(format!(
            "Usage: `/{0} connect [PROJECT_KEY]`, `/{0} disconnect [PROJECT_KEY]` or `/{0} ISSUE-123`",
            COMMAND
        ))),
    }
}

fn project_line(key: &str, name: &str, self_url: &str) -> String {
    format!("[{} - {}]({}/browse/{})", key, name, base_url_from_self(self_url), key)
}

async fn connected_links(store: &ProjectSubscriptionStore, room_id: &str) -> Result<Vec<ProjectLink>, DatabaseError> {
    Ok(store
        .list_links(Some(room_id))
        .await?
        .into_iter()
        .flat_map(|record| record.connected_projects.into_values())
        .collect())
}

async fn list_connectable(
    store: &ProjectSubscriptionStore,
    tracker: &dyn IssueTracker,
    room_id: &str,
) -> Result<RenderedMessage, CommandError> {
    let connected = connected_links(store, room_id).await?;
    let projects = tracker.list_projects().await?;

    let (already, available): (Vec<&JiraProject>, Vec<&JiraProject>) = projects
        .iter()
        .partition(|p| connected.iter().any(|l| l.project_key.eq_ignore_ascii_case(&p.key)));
    let line = |p: &&JiraProject| {
        format!(
            "- {} {}",
            project_line(&p.key, &p.name, &p.self_url),
            p.description.as_deref().unwrap_or_default()
        )
        .trim_end()
        .to_string()
    };

    let mut sections = Vec::new();
    if !already.is_empty() {
        sections.push(format!(
            "These are the projects already connected to this room:\n{}",
            already.iter().map(line).join("\n")
        ));
    }
    if available.is_empty() {
        sections.push("There are currently no available projects for you to connect :/".to_string());
    } else {
        sections.push(format!(
            "These are the currently available projects for you to connect to:\n{}\n\nYou can connect to Jira projects by typing `/{} connect PROJECT_KEY`",
            available.iter().map(line).join("\n"),
            COMMAND
        ));
    }
    Ok(RenderedMessage::text(sections.join("\n\n")))
}

async fn connect(
    store: &ProjectSubscriptionStore,
    tracker: &dyn IssueTracker,
    room_id: &str,
    key: &str,
) -> Result<RenderedMessage, CommandError> {
    let project = match tracker.get_project(key).await {
        Ok(project) => project,
        Err(JiraError::NotFound(reason)) => {
            tracing::debug!(project = key, reason = %reason, "project to connect not found");
            return Ok(RenderedMessage::text(format!(
                "Project with key \"{}\" could not be found",
                key
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let link = ProjectLink::from(&project);
    let attachment = Attachment {
        title_text: format!("{} - {}", link.project_key, link.name),
        title_link: link.browse_url(),
        body_text: project.description.clone(),
        fields: Vec::new(),
    };
    store.connect(room_id, link).await?;

    Ok(RenderedMessage {
        text: format!(
            "Jira project *{}* successfully connected! This room will now be notified of certain events in the project",
            project.name
        ),
        attachments: vec![attachment],
    })
}

async fn list_connected(store: &ProjectSubscriptionStore, room_id: &str) -> Result<RenderedMessage, CommandError> {
    let connected = connected_links(store, room_id).await?;
    if connected.is_empty() {
        return Ok(RenderedMessage::text("There are no connected projects in this room"));
    }

    Ok(RenderedMessage::text(format!(
        "These are the currently connected projects in this room:\n{}\n\nYou can disconnect a Jira project by typing `/{} disconnect PROJECT_KEY`",
        connected
            .iter()
            .map(|l| project_line(&l.project_key, &l.name, &l.self_url))
            .join("\n"),
        COMMAND
    )))
}

async fn disconnect(store: &ProjectSubscriptionStore, room_id: &str, key: &str) -> Result<RenderedMessage, CommandError> {
    Ok(match store.disconnect(room_id, key).await? {
        Some(link) => RenderedMessage::text(format!(
            "Jira project *{}* successfully disconnected! This room will no longer receive notifications about it",
            link.name
        )),
        None => RenderedMessage::text(format!("Project with key \"{}\" is not connected", key)),
    })
}

/// The project only has to be connected somewhere, not necessarily in the
/// invoking room.
async fn lookup(
    store: &ProjectSubscriptionStore,
    tracker: &dyn IssueTracker,
    key: &str,
) -> Result<RenderedMessage, CommandError> {
    let not_found = || RenderedMessage::text(format!("Issue \"{}\" not found", key));

    let issue = match tracker.get_issue(key).await {
        Ok(issue) => issue,
        Err(JiraError::NotFound(_)) => return Ok(not_found()),
        Err(e) => return Err(e.into()),
    };
    if !store.is_connected(None, &issue.project_key).await? {
        return Ok(not_found());
    }
    Ok(renderer::render_issues(std::slice::from_ref(&issue)).unwrap_or_else(not_found))
}
