pub mod chat;
pub mod persona;
pub mod profile;
pub mod recommendation;

use serde::{ Deserialize, Serialize };

/// The signed-in user as the identity provider reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Email-like key scoping every backend call.
    pub key: String,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), display_name: None }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("")
    }

    /// First word of the display name, used in greetings.
    pub fn first_name(&self) -> &str {
        self.display_name().split_whitespace().next().unwrap_or("")
    }
}
