use crate::database::{DatabaseError, RecordStore};
use crate::models::{Installation, ProjectLink, RoomProjects, WebhookRegistration};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const PROJECTS_PREFIX: &str = "projects/";
const INSTALLATION_KEY: &str = "installation";
const WEBHOOK_KEY: &str = "webhook";

fn room_key(room_id: &str) -> String {
    format!("{}{}", PROJECTS_PREFIX, room_id)
}

/// Which Jira projects are connected to which chat rooms. One record per
/// room; mutations rewrite the whole record under a per-room lock so two
/// concurrent edits of the same room cannot lose each other's update.
pub struct ProjectSubscriptionStore {
    records: Arc<dyn RecordStore>,
    room_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectSubscriptionStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    fn room_lock(&self, room_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .room_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drops the room's lock entry once no other task holds or awaits it.
    /// Clones are only handed out under the map lock, so a count of two
    /// (the map and `lock`) means nobody else can be using it.
    fn release_room_lock(&self, room_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .room_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if Arc::strong_count(&lock) == 2 {
            locks.remove(room_id);
        }
    }

    /// All rooms' mappings ordered by room id, or at most the one record of
    /// `room_id`.
    pub async fn list_links(&self, room_id: Option<&str>) -> Result<Vec<RoomProjects>, DatabaseError> {
        let raw = match room_id {
            Some(room_id) => {
                let key = room_key(room_id);
                self.records
                    .read(&key)
                    .await?
                    .map(|value| vec![(key, value)])
                    .unwrap_or_default()
            }
            None => self.records.read_prefix(PROJECTS_PREFIX).await?,
        };

        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_str::<RoomProjects>(&value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping unreadable project record");
                    None
                }
            })
            .collect())
    }

    async fn room_projects(&self, room_id: &str) -> Result<RoomProjects, DatabaseError> {
        Ok(self
            .list_links(Some(room_id))
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| RoomProjects {
                room: room_id.to_string(),
                ..Default::default()
            }))
    }

    async fn persist(&self, record: &RoomProjects) -> Result<(), DatabaseError> {
        let value = serde_json::to_string(record)?;
        self.records.write(&room_key(&record.room), &value).await
    }

    /// Upserts `link` into the room's mapping under its uppercased key. The
    /// caller is responsible for checking that the project exists in Jira.
    pub async fn connect(&self, room_id: &str, mut link: ProjectLink) -> Result<(), DatabaseError> {
        let lock = self.room_lock(room_id);
        let result = {
            let _guard = lock.lock().await;
            link.project_key = link.project_key.to_uppercase();
            self.upsert_link(room_id, link).await
        };
        self.release_room_lock(room_id, lock);
        result
    }

    async fn upsert_link(&self, room_id: &str, link: ProjectLink) -> Result<(), DatabaseError> {
        let mut record = self.room_projects(room_id).await?;
        record.connected_projects.insert(link.project_key.clone(), link);
        self.persist(&record).await?;

        tracing::info!(room = room_id, projects = record.connected_projects.len(), "project connected");
        Ok(())
    }

    /// Removes the project (case-insensitively) from the room. Returns the
    /// removed link, or `None` when the room had no such project.
    pub async fn disconnect(&self, room_id: &str, project_key: &str) -> Result<Option<ProjectLink>, DatabaseError> {
        let lock = self.room_lock(room_id);
        let result = {
            let _guard = lock.lock().await;
            self.remove_link(room_id, &project_key.to_uppercase()).await
        };
        self.release_room_lock(room_id, lock);
        result
    }

    async fn remove_link(&self, room_id: &str, key: &str) -> Result<Option<ProjectLink>, DatabaseError> {
        let mut record = self.room_projects(room_id).await?;
        let removed = record.connected_projects.remove(key);
        if removed.is_some() {
            self.persist(&record).await?;
            tracing::info!(room = room_id, project = key, "project disconnected");
        }
        Ok(removed)
    }

    /// Without a room this answers whether the project is connected in any
    /// room at all.
    pub async fn is_connected(&self, room_id: Option<&str>, project_key: &str) -> Result<bool, DatabaseError> {
        let key = project_key.to_uppercase();
        Ok(self
            .list_links(room_id)
            .await?
            .iter()
            .any(|record| record.connected_projects.contains_key(&key)))
    }

    /// Rooms whose mapping contains `project_key`.
    pub async fn rooms_for_project(&self, project_key: &str) -> Result<Vec<String>, DatabaseError> {
        let key = project_key.to_uppercase();
        Ok(self
            .list_links(None)
            .await?
            .into_iter()
            .filter(|record| record.connected_projects.contains_key(&key))
            .map(|record| record.room)
            .collect())
    }
}

pub async fn load_installation(records: &dyn RecordStore) -> Result<Option<Installation>, DatabaseError> {
    match records.read(INSTALLATION_KEY).await? {
        Some(value) => Ok(Some(serde_json::from_str(&value)?)),
        None => Ok(None),
    }
}

pub async fn save_installation(records: &dyn RecordStore, installation: &Installation) -> Result<(), DatabaseError> {
    records
        .write(INSTALLATION_KEY, &serde_json::to_string(installation)?)
        .await
}

pub async fn load_webhook_registration(records: &dyn RecordStore) -> Result<Option<WebhookRegistration>, DatabaseError> {
    match records.read(WEBHOOK_KEY).await? {
        Some(value) => Ok(Some(serde_json::from_str(&value)?)),
        None => Ok(None),
    }
}

pub async fn save_webhook_registration(
    records: &dyn RecordStore,
    registration: &WebhookRegistration,
) -> Result<(), DatabaseError> {
    records
        .write(WEBHOOK_KEY, &serde_json::to_string(registration)?)
        .await
}
