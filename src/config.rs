use crate::chat_client::ChatCredentials;
use crate::models::Installation;
use std::env;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_PATH: &str = "storage/jira_chat_bridge.db";
const DEFAULT_SENDER_ALIAS: &str = "Jira";
const DEFAULT_SENDER_AVATAR: &str =
    "https://wac-cdn.atlassian.com/dam/jcr:b5e4a5a5-94b9-4098-ad1f-af4ba39b401f/corporate-deck@2x_V2.png";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{present} is set but {missing} is not")]
    Incomplete {
        present: &'static str,
        missing: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: String,
    /// Seeds the stored installation when both Jira variables are present.
    pub installation: Option<Installation>,
    pub chat: ChatCredentials,
    /// Where Jira should deliver events. A webhook is registered at startup
    /// when this is set and none is stored yet.
    pub public_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let installation = match (get("JIRA_BASE_URL"), get("JIRA_AUTHORIZATION")) {
            (Some(base_url), Some(authorization)) => Some(Installation {
                base_url,
                authorization,
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: "JIRA_BASE_URL",
                    missing: "JIRA_AUTHORIZATION",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: "JIRA_AUTHORIZATION",
                    missing: "JIRA_BASE_URL",
                })
            }
            (None, None) => None,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_path: get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            installation,
            chat: ChatCredentials {
                base_url: require("CHAT_BASE_URL")?,
                user_id: require("CHAT_USER_ID")?,
                auth_token: require("CHAT_AUTH_TOKEN")?,
                sender_alias: get("CHAT_SENDER_ALIAS").unwrap_or_else(|| DEFAULT_SENDER_ALIAS.to_string()),
                sender_avatar: get("CHAT_SENDER_AVATAR").unwrap_or_else(|| DEFAULT_SENDER_AVATAR.to_string()),
            },
            public_webhook_url: get("PUBLIC_WEBHOOK_URL"),
        })
    }
}
