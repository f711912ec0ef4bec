pub mod http;
mod wire;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::chat::HistoryEntry;
use crate::models::persona::{ PersonaDraft, PersonaId, PersonaRecord };
use crate::models::profile::Profile;
use crate::models::recommendation::Recommendation;
use self::http::HttpBackend;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {source}")] Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Backend returned {status} for {endpoint}: {body}")] Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Could not decode {endpoint} response: {message}")] Decode {
        endpoint: &'static str,
        message: String,
    },

    #[error("Invalid backend configuration: {0}")] Config(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// One chat turn as sent to the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendMessage {
    pub identity: String,
    pub persona_id: PersonaId,
    /// The persona's pasted previous chat, sent as context with every turn.
    pub persona_instructions: String,
    pub message: String,
}

/// Every backend call the client makes. Single shot: no retries, no caching.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn create_persona(&self, identity: &str, draft: &PersonaDraft) -> ApiResult<PersonaId>;

    async fn list_personas(&self, identity: &str) -> ApiResult<Vec<PersonaRecord>>;

    async fn update_persona(
        &self,
        identity: &str,
        persona_id: &PersonaId,
        draft: &PersonaDraft
    ) -> ApiResult<()>;

    async fn delete_persona(&self, identity: &str, persona_id: &PersonaId) -> ApiResult<()>;

    /// Returns the assistant's reply text.
    async fn send_message(&self, request: &SendMessage) -> ApiResult<String>;

    async fn get_history(
        &self,
        identity: &str,
        persona_id: &PersonaId
    ) -> ApiResult<Vec<HistoryEntry>>;

    async fn delete_chat_history(&self, identity: &str, persona_id: &PersonaId) -> ApiResult<()>;

    async fn request_analysis(
        &self,
        identity: &str,
        persona_id: &PersonaId,
        transcript: &str
    ) -> ApiResult<Vec<Recommendation>>;

    async fn get_profile(&self, identity: &str) -> ApiResult<Profile>;

    async fn update_profile(&self, identity: &str, profile: &Profile) -> ApiResult<()>;
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub fn new_client(config: &BackendConfig) -> ApiResult<Arc<dyn BackendApi>> {
    let client = HttpBackend::from_config(config)?;
    Ok(Arc::new(client))
}
