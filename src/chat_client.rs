use crate::models::{Attachment, RenderedMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Chat server responded with {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Invalid chat credentials header")]
    InvalidCredentials,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
}

/// Message delivery on the chat side.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// `Ok(None)` when the room does not exist (anymore).
    async fn find_room(&self, room_id: &str) -> Result<Option<Room>, ChatError>;
    async fn send(&self, room: &Room, message: &RenderedMessage) -> Result<(), ChatError>;
}

#[derive(Debug, Clone)]
pub struct ChatCredentials {
    pub base_url: String,
    pub user_id: String,
    pub auth_token: String,
    pub sender_alias: String,
    pub sender_avatar: String,
}

pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    sender_alias: String,
    sender_avatar: String,
}

#[derive(Deserialize)]
struct RoomInfoResponse {
    room: Option<Room>,
}

#[derive(Serialize)]
struct OutboundField<'a> {
    title: &'a str,
    value: &'a str,
    short: bool,
}

#[derive(Serialize)]
struct OutboundAttachment<'a> {
    title: &'a str,
    title_link: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    fields: Vec<OutboundField<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboundMessage<'a> {
    room_id: &'a str,
    text: &'a str,
    alias: &'a str,
    avatar: &'a str,
    groupable: bool,
    attachments: Vec<OutboundAttachment<'a>>,
}

impl<'a> From<&'a Attachment> for OutboundAttachment<'a> {
    fn from(attachment: &'a Attachment) -> Self {
        Self {
            title: &attachment.title_text,
            title_link: &attachment.title_link,
            text: attachment.body_text.as_deref(),
            fields: attachment
                .fields
                .iter()
                .map(|field| OutboundField {
                    title: &field.label,
                    value: &field.value,
                    short: field.is_short,
                })
                .collect(),
        }
    }
}

impl ChatClient {
    pub fn new(credentials: &ChatCredentials) -> Result<Self, ChatError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-user-id",
            credentials
                .user_id
                .parse()
                .map_err(|_| ChatError::InvalidCredentials)?,
        );
        headers.insert(
            "x-auth-token",
            credentials
                .auth_token
                .parse()
                .map_err(|_| ChatError::InvalidCredentials)?,
        );

        Ok(Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .build()?,
            base_url: credentials.base_url.trim_end_matches('/').to_string(),
            sender_alias: credentials.sender_alias.clone(),
            sender_avatar: credentials.sender_avatar.clone(),
        })
    }
}

#[async_trait]
impl ChatPlatform for ChatClient {
    async fn find_room(&self, room_id: &str) -> Result<Option<Room>, ChatError> {
        let response = self
            .client
            .get(format!("{}/api/v1/rooms.info", self.base_url))
            .query(&[("roomId", room_id)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json::<RoomInfoResponse>().await?.room)
    }

    async fn send(&self, room: &Room, message: &RenderedMessage) -> Result<(), ChatError> {
        let payload = OutboundMessage {
            room_id: &room.id,
            text: &message.text,
            alias: &self.sender_alias,
            avatar: &self.sender_avatar,
            groupable: false,
            attachments: message.attachments.iter().map(OutboundAttachment::from).collect(),
        };

        let response = self
            .client
            .post(format!("{}/api/v1/chat.postMessage", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
