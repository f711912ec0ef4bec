use async_trait::async_trait;
use log::{ debug, error };
use reqwest::{ Client as HttpClient, RequestBuilder };
use serde::de::DeserializeOwned;
use url::Url;

use super::wire::{
    CreatedPersona,
    DeletePersonaBody,
    PersonaBody,
    ProfileBody,
    SendMessageBody,
    SendMessageReply,
    SessionPersonaBody,
    SuggestBody,
};
use super::{ ApiError, ApiResult, BackendApi, BackendConfig, SendMessage };
use crate::models::chat::HistoryEntry;
use crate::models::persona::{ PersonaDraft, PersonaId, PersonaListResponse, PersonaRecord };
use crate::models::profile::Profile;
use crate::models::recommendation::{ Recommendation, SuggestionResponse };

/// `BackendApi` over plain HTTP with JSON bodies.
pub struct HttpBackend {
    http: HttpClient,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, http: HttpClient) -> ApiResult<Self> {
        // A trailing slash keeps `join` from dropping a path prefix.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e|
            ApiError::Config(format!("Invalid backend URL '{}': {}", base_url, e))
        )?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &BackendConfig) -> ApiResult<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Self::new(&config.base_url, http)
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn send_raw(&self, endpoint: &'static str, req: RequestBuilder) -> ApiResult<String> {
        debug!("Calling backend endpoint {}", endpoint);
        let resp = req.send().await.map_err(|source| {
            error!("Backend request to {} failed: {}", endpoint, source);
            ApiError::Transport { endpoint, source }
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|source| ApiError::Transport { endpoint, source })?;
        if !status.is_success() {
            error!("Backend returned {} for {}", status, endpoint);
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        req: RequestBuilder
    ) -> ApiResult<T> {
        let body = self.send_raw(endpoint, req).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn create_persona(&self, identity: &str, draft: &PersonaDraft) -> ApiResult<PersonaId> {
        let req = self.http.post(self.url("create_persona")?).json(&PersonaBody::new(identity, draft));
        let created: CreatedPersona = self.send_json("create_persona", req).await?;
        match created.persona_id {
            serde_json::Value::String(id) if !id.is_empty() => Ok(PersonaId::new(id)),
            serde_json::Value::Number(n) => Ok(PersonaId::new(n.to_string())),
            other =>
                Err(ApiError::Decode {
                    endpoint: "create_persona",
                    message: format!("unusable persona_id: {}", other),
                }),
        }
    }

    async fn list_personas(&self, identity: &str) -> ApiResult<Vec<PersonaRecord>> {
        let req = self.http.get(self.url("list_personas")?).query(&[("user_id", identity)]);
        let resp: PersonaListResponse = self.send_json("list_personas", req).await?;
        Ok(resp.into_records())
    }

    async fn update_persona(
        &self,
        identity: &str,
        persona_id: &PersonaId,
        draft: &PersonaDraft
    ) -> ApiResult<()> {
        let mut url = self.url("update_persona/")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Config("Backend URL cannot take path segments".into()))?
            .pop_if_empty()
            .push(persona_id.as_str());
        let req = self.http.put(url).json(&PersonaBody::new(identity, draft));
        self.send_raw("update_persona", req).await.map(|_| ())
    }

    async fn delete_persona(&self, identity: &str, persona_id: &PersonaId) -> ApiResult<()> {
        let body = DeletePersonaBody {
            user_id: identity,
            persona_id: persona_id.as_str(),
        };
        let req = self.http.delete(self.url("delete_persona")?).json(&body);
        self.send_raw("delete_persona", req).await.map(|_| ())
    }

    async fn send_message(&self, request: &SendMessage) -> ApiResult<String> {
        let body = SendMessageBody {
            session_id: &request.identity,
            persona_id: request.persona_id.as_str(),
            persona_instructions: &request.persona_instructions,
            message: &request.message,
        };
        let req = self.http.post(self.url("send_message")?).json(&body);
        let reply: SendMessageReply = self.send_json("send_message", req).await?;
        Ok(reply.response)
    }

    async fn get_history(
        &self,
        identity: &str,
        persona_id: &PersonaId
    ) -> ApiResult<Vec<HistoryEntry>> {
        let req = self.http
            .get(self.url("get_history")?)
            .query(&[("session_id", identity), ("persona_id", persona_id.as_str())]);
        let entries: Option<Vec<HistoryEntry>> = self.send_json("get_history", req).await?;
        Ok(entries.unwrap_or_default())
    }

    async fn delete_chat_history(&self, identity: &str, persona_id: &PersonaId) -> ApiResult<()> {
        let body = SessionPersonaBody {
            session_id: identity,
            persona_id: persona_id.as_str(),
        };
        let req = self.http.delete(self.url("delete_chat")?).json(&body);
        self.send_raw("delete_chat", req).await.map(|_| ())
    }

    async fn request_analysis(
        &self,
        identity: &str,
        persona_id: &PersonaId,
        transcript: &str
    ) -> ApiResult<Vec<Recommendation>> {
        let body = SuggestBody {
            chat_history: transcript,
            session_id: identity,
            persona_id: persona_id.as_str(),
        };
        let req = self.http.post(self.url("suggest")?).json(&body);
        let resp: SuggestionResponse = self.send_json("suggest", req).await?;
        Ok(resp.recommendations)
    }

    async fn get_profile(&self, identity: &str) -> ApiResult<Profile> {
        let req = self.http.get(self.url("get_profile")?).query(&[("user_id", identity)]);
        self.send_json("get_profile", req).await
    }

    async fn update_profile(&self, identity: &str, profile: &Profile) -> ApiResult<()> {
        let body = ProfileBody { user_id: identity, profile };
        let req = self.http.put(self.url("update_profile")?).json(&body);
        self.send_raw("update_profile", req).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_keeps_prefix() {
        let backend = HttpBackend::new("http://localhost:8000/api", HttpClient::new()).unwrap();
        assert_eq!(backend.url("list_personas").unwrap().as_str(), "http://localhost:8000/api/list_personas");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HttpBackend::new("not a url", HttpClient::new()).err().unwrap();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_from_default_config() {
        let backend = HttpBackend::from_config(&BackendConfig::default()).unwrap();
        assert_eq!(backend.url("get_profile").unwrap().as_str(), "http://localhost:8000/get_profile");
    }
}
