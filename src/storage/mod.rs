//! Local key/value snapshot file.
//!
//! Holds one denormalized copy of the persona the user just created or picked,
//! so the chat view has something to show before its own load completes. It is
//! never treated as a source of truth.

use chrono::{ DateTime, Utc };
use log::{ debug, warn };
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value as JsonValue };
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::persona::{ Persona, PersonaDraft, PersonaId };

pub const PERSONA_KEY: &str = "alter-ego-persona";
pub const MESSAGES_KEY: &str = "alter-ego-messages";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Snapshot file IO error at {path}: {source}")] Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Snapshot serialization error: {0}")] Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaSnapshot {
    pub id: PersonaId,
    pub name: String,
    pub description: String,
    pub traits: String,
    pub interests: String,
    #[serde(rename = "writingStyle")]
    pub writing_style: String,
    #[serde(rename = "previousChat")]
    pub previous_chat: String,
    pub saved_at: DateTime<Utc>,
}

impl PersonaSnapshot {
    pub fn from_draft(id: PersonaId, draft: &PersonaDraft) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            traits: draft.traits.traits.clone(),
            interests: draft.traits.interests.clone(),
            writing_style: draft.traits.writing_style.clone(),
            previous_chat: draft.previous_chat.clone(),
            saved_at: Utc::now(),
        }
    }

    pub fn from_persona(persona: &Persona) -> Self {
        Self::from_draft(persona.id.clone(), &PersonaDraft::from_persona(persona))
    }
}

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Map<String, JsonValue>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Map::new());
            }
            Err(source) => {
                return Err(StorageError::Io { path: self.path.clone(), source });
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<JsonValue>(&content)? {
            JsonValue::Object(map) => Ok(map),
            _ => {
                warn!("Snapshot file {} is not an object, starting fresh", self.path.display());
                Ok(Map::new())
            }
        }
    }

    fn write_all(&self, map: &Map<String, JsonValue>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, content).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_all(&map)?;
        debug!("Stored {} in {}", key, self.path.display());
        Ok(())
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let mut map = self.read_all()?;
        match map.remove(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }

    /// Stores the persona snapshot and drops any cached message list.
    pub fn remember_persona(&self, snapshot: &PersonaSnapshot) -> Result<(), StorageError> {
        self.set(PERSONA_KEY, snapshot)?;
        self.remove(MESSAGES_KEY)
    }

    pub fn last_persona(&self) -> Result<Option<PersonaSnapshot>, StorageError> {
        self.get(PERSONA_KEY)
    }
}
