//! In-process stand-ins for Jira and the chat server.

use crate::chat_client::{ChatError, ChatPlatform, Room};
use crate::jira_client::{IssueTracker, JiraError};
use crate::models::{IssueRef, JiraProject, RenderedMessage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn issue(key: &str) -> IssueRef {
    let project_key = key.split('-').next().unwrap_or(key).to_string();
    IssueRef {
        key: key.to_string(),
        self_url: "https://h/rest/api/2/issue/10".to_string(),
        summary: format!("Summary of {}", key),
        type_name: "Bug".to_string(),
        status_name: "Open".to_string(),
        priority_name: Some("Major".to_string()),
        assignee: None,
        project_key,
        description: None,
        attachments: Vec::new(),
    }
}

pub fn project(key: &str) -> JiraProject {
    JiraProject {
        id: format!("id-{}", key),
        key: key.to_string(),
        name: format!("Project {}", key),
        self_url: format!("https://h/rest/api/2/project/{}", key),
        description: Some(format!("About {}", key)),
    }
}

#[derive(Default)]
pub struct FakeTracker {
    pub issues: HashMap<String, IssueRef>,
    pub projects: Vec<JiraProject>,
    pub lookups: Mutex<Vec<String>>,
    pub unavailable: bool,
}

impl FakeTracker {
    pub fn with_issues(keys: &[&str]) -> Self {
        Self {
            issues: keys.iter().map(|k| (k.to_string(), issue(k))).collect(),
            ..Default::default()
        }
    }

    pub fn with_projects(keys: &[&str]) -> Self {
        Self {
            projects: keys.iter().map(|k| project(k)).collect(),
            ..Default::default()
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), JiraError> {
        if self.unavailable {
            return Err(JiraError::Upstream {
                status: 503,
                body: "down".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn list_projects(&self) -> Result<Vec<JiraProject>, JiraError> {
        self.check_available()?;
        Ok(self.projects.clone())
    }

    async fn get_project(&self, key: &str) -> Result<JiraProject, JiraError> {
        self.check_available()?;
        self.projects
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .cloned()
            .ok_or_else(|| JiraError::NotFound(key.to_string()))
    }

    async fn get_issue(&self, key: &str) -> Result<IssueRef, JiraError> {
        self.lookups.lock().unwrap().push(key.to_string());
        self.check_available()?;
        self.issues
            .get(key)
            .cloned()
            .ok_or_else(|| JiraError::NotFound(key.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingChat {
    pub rooms: HashSet<String>,
    pub failing: HashSet<String>,
    pub sent: Mutex<Vec<(String, RenderedMessage)>>,
}

impl RecordingChat {
    pub fn with_rooms(rooms: &[&str]) -> Self {
        Self {
            rooms: rooms.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, RenderedMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<_> = self.sent().into_iter().map(|(room, _)| room).collect();
        rooms.sort();
        rooms
    }
}

#[async_trait]
impl ChatPlatform for RecordingChat {
    async fn find_room(&self, room_id: &str) -> Result<Option<Room>, ChatError> {
        Ok(self.rooms.get(room_id).map(|id| Room {
            id: id.clone(),
            name: None,
        }))
    }

    async fn send(&self, room: &Room, message: &RenderedMessage) -> Result<(), ChatError> {
        if self.failing.contains(&room.id) {
            return Err(ChatError::Upstream {
                status: 500,
                body: "rejected".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((room.id.clone(), message.clone()));
        Ok(())
    }
}
