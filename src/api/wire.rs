//! Request and response bodies exactly as the backend spells them.

use serde::{ Deserialize, Serialize };

use crate::models::persona::PersonaDraft;
use crate::models::profile::Profile;

#[derive(Serialize)]
pub(crate) struct PersonaBody<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub traits: &'a str,
    pub interests: &'a str,
    #[serde(rename = "writingStyle")]
    pub writing_style: &'a str,
    #[serde(rename = "previousChat")]
    pub previous_chat: &'a str,
}

impl<'a> PersonaBody<'a> {
    pub fn new(user_id: &'a str, draft: &'a PersonaDraft) -> Self {
        Self {
            user_id,
            name: &draft.name,
            description: &draft.description,
            traits: &draft.traits.traits,
            interests: &draft.traits.interests,
            writing_style: &draft.traits.writing_style,
            previous_chat: &draft.previous_chat,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct CreatedPersona {
    pub persona_id: serde_json::Value,
}

#[derive(Serialize)]
pub(crate) struct DeletePersonaBody<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    pub persona_id: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SessionPersonaBody<'a> {
    pub session_id: &'a str,
    pub persona_id: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SendMessageBody<'a> {
    pub session_id: &'a str,
    pub persona_id: &'a str,
    pub persona_instructions: &'a str,
    pub message: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct SendMessageReply {
    pub response: String,
}

#[derive(Serialize)]
pub(crate) struct SuggestBody<'a> {
    #[serde(rename = "chatHistory")]
    pub chat_history: &'a str,
    pub session_id: &'a str,
    pub persona_id: &'a str,
}

#[derive(Serialize)]
pub(crate) struct ProfileBody<'a> {
    pub user_id: &'a str,
    #[serde(flatten)]
    pub profile: &'a Profile,
}
