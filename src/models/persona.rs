//! Persona records and identifier resolution.
//!
//! The backend is inconsistent about which key carries a persona's identifier
//! (`persona_id`, `_id` or `id`) and whether it is a string or a number. That
//! inconsistency stops at [`PersonaRecord`]: everything past this module uses
//! the canonical [`PersonaId`].

use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use std::fmt;

use crate::prompt::{ self, PersonaTraits };

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaId(String);

impl PersonaId {
    pub fn new(id: impl Into<String>) -> Self {
        PersonaId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonaId {
    fn from(s: &str) -> Self {
        PersonaId(s.to_string())
    }
}

/// A persona as the client holds it for the duration of a page visit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    /// Free-form previous chat pasted by the user; forwarded on every send.
    pub chat_history: String,
}

impl Persona {
    pub fn traits(&self) -> PersonaTraits {
        prompt::decode(&self.system_prompt)
    }
}

pub fn greeting_for(name: &str) -> String {
    format!("Hello! I'm {}. What's on your mind?", name)
}

/// Everything a user fills in to create or fully update a persona.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDraft {
    pub name: String,
    pub description: String,
    pub traits: PersonaTraits,
    pub previous_chat: String,
}

impl PersonaDraft {
    /// Seeds an edit form from a loaded persona.
    pub fn from_persona(persona: &Persona) -> Self {
        Self {
            name: persona.name.clone(),
            description: persona.description.clone(),
            traits: persona.traits(),
            previous_chat: persona.chat_history.clone(),
        }
    }

    /// The persona a subsequent load would produce after this draft is saved.
    pub fn apply_to(&self, persona: &Persona) -> Persona {
        Persona {
            id: persona.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            system_prompt: self.traits.encode(),
            chat_history: self.previous_chat.clone(),
        }
    }
}

/// A persona entry exactly as the list endpoint returns it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PersonaRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<JsonValue>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub underscore_id: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub chat_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<JsonValue>,
}

impl PersonaRecord {
    fn candidates(&self) -> [Option<&JsonValue>; 3] {
        [self.persona_id.as_ref(), self.underscore_id.as_ref(), self.id.as_ref()]
    }

    /// The identifier under the first key that carries a usable value.
    pub fn primary_id(&self) -> Option<String> {
        self.candidates().into_iter().flatten().find_map(normalize_id)
    }

    pub fn matches(&self, requested: &str) -> bool {
        if self.primary_id().as_deref() == Some(requested) {
            return true;
        }
        self.candidates()
            .into_iter()
            .flatten()
            .any(|value| matches!(value, JsonValue::String(s) if s == requested))
    }

    pub fn into_persona(self) -> Option<Persona> {
        let id = self.primary_id()?;
        Some(Persona {
            id: PersonaId(id),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            system_prompt: self.system_prompt.unwrap_or_default(),
            chat_history: self.chat_history.unwrap_or_default(),
        })
    }
}

/// String form of an identifier value; empty strings and non-scalars are unusable.
fn normalize_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The list endpoint answers with either a bare array or `{ "personas": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PersonaListResponse {
    Bare(Vec<PersonaRecord>),
    Wrapped {
        #[serde(default)]
        personas: Vec<PersonaRecord>,
    },
}

impl PersonaListResponse {
    pub fn into_records(self) -> Vec<PersonaRecord> {
        match self {
            PersonaListResponse::Bare(records) => records,
            PersonaListResponse::Wrapped { personas } => personas,
        }
    }
}

pub fn find_persona(records: Vec<PersonaRecord>, requested: &PersonaId) -> Option<Persona> {
    records
        .into_iter()
        .find(|record| record.matches(requested.as_str()))
        .and_then(PersonaRecord::into_persona)
        .map(|mut persona| {
            // A match through a secondary key keeps the requested id canonical.
            persona.id = requested.clone();
            persona
        })
}
