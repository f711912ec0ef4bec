use serde::{ Serialize, Deserialize };
use std::fmt;
use url::Url;
use uuid::Uuid;

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/8.x/bottts-neutral/svg";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier assigned when a message is constructed on the client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        MessageId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            avatar: None,
        }
    }

    /// Assistant messages carry the persona's avatar.
    pub fn assistant(content: impl Into<String>, persona_name: &str) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: content.into(),
            avatar: Some(avatar_url(persona_name)),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// One entry of the stored history as the backend returns it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

pub fn avatar_url(seed: &str) -> String {
    match Url::parse_with_params(AVATAR_BASE_URL, &[("seed", seed)]) {
        Ok(url) => url.into(),
        Err(_) => AVATAR_BASE_URL.to_string(),
    }
}
