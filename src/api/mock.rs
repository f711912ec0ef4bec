//! In-memory `BackendApi` used by the view tests.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{ HashMap, HashSet };
use std::sync::Mutex;

use super::{ ApiError, ApiResult, BackendApi, SendMessage };
use crate::models::chat::{ HistoryEntry, Role };
use crate::models::persona::{ PersonaDraft, PersonaId, PersonaRecord };
use crate::models::profile::Profile;
use crate::models::recommendation::Recommendation;

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub(crate) struct MockBackend {
    pub personas: Mutex<Vec<PersonaRecord>>,
    pub histories: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    pub profiles: Mutex<HashMap<String, Profile>>,
    pub recommendations: Mutex<Vec<Recommendation>>,
    pub failing: Mutex<HashSet<&'static str>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub sent: Mutex<Vec<SendMessage>>,
    pub transcripts: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<(PersonaId, PersonaDraft)>>,
    pub reply: Mutex<Option<String>>,
    /// Runs inside `send_message` before it answers.
    pub on_send: Mutex<Option<Hook>>,
    next_id: Mutex<u32>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persona(self, id: &str, name: &str, system_prompt: &str) -> Self {
        let record: PersonaRecord = serde_json::from_value(
            json!({
                "persona_id": id,
                "name": name,
                "description": format!("{} from work", name),
                "system_prompt": system_prompt,
                "chat_history": "we met at the climbing gym",
            })
        ).expect("valid persona record");
        self.personas.lock().unwrap().push(record);
        self
    }

    pub fn with_history(self, persona_id: &str, entries: &[(Role, &str)]) -> Self {
        let entries = entries
            .iter()
            .map(|(role, content)| HistoryEntry { role: *role, content: content.to_string() })
            .collect();
        self.histories.lock().unwrap().insert(persona_id.to_string(), entries);
        self
    }

    pub fn with_profile(self, identity: &str, profile: Profile) -> Self {
        self.profiles.lock().unwrap().insert(identity.to_string(), profile);
        self
    }

    pub fn fail(&self, endpoint: &'static str) {
        self.failing.lock().unwrap().insert(endpoint);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.failing.lock().unwrap().remove(endpoint);
    }

    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = Some(reply.to_string());
    }

    pub fn set_recommendations(&self, recs: Vec<Recommendation>) {
        *self.recommendations.lock().unwrap() = recs;
    }

    pub fn on_send(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_send.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == endpoint).count()
    }

    fn enter(&self, endpoint: &'static str) -> ApiResult<()> {
        self.calls.lock().unwrap().push(endpoint);
        if self.failing.lock().unwrap().contains(endpoint) {
            return Err(ApiError::Status {
                endpoint,
                status: 503,
                body: "backend unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn create_persona(&self, _identity: &str, draft: &PersonaDraft) -> ApiResult<PersonaId> {
        self.enter("create_persona")?;
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = format!("persona-{}", next);
        let record: PersonaRecord = serde_json::from_value(
            json!({
                "persona_id": id,
                "name": draft.name,
                "description": draft.description,
                "system_prompt": draft.traits.encode(),
                "chat_history": draft.previous_chat,
            })
        ).expect("valid persona record");
        self.personas.lock().unwrap().push(record);
        Ok(PersonaId::new(id))
    }

    async fn list_personas(&self, _identity: &str) -> ApiResult<Vec<PersonaRecord>> {
        self.enter("list_personas")?;
        Ok(self.personas.lock().unwrap().clone())
    }

    async fn update_persona(
        &self,
        _identity: &str,
        persona_id: &PersonaId,
        draft: &PersonaDraft
    ) -> ApiResult<()> {
        self.enter("update_persona")?;
        let mut personas = self.personas.lock().unwrap();
        for record in personas.iter_mut().filter(|r| r.matches(persona_id.as_str())) {
            record.name = Some(draft.name.clone());
            record.description = Some(draft.description.clone());
            record.system_prompt = Some(draft.traits.encode());
            record.chat_history = Some(draft.previous_chat.clone());
        }
        self.updates.lock().unwrap().push((persona_id.clone(), draft.clone()));
        Ok(())
    }

    async fn delete_persona(&self, _identity: &str, persona_id: &PersonaId) -> ApiResult<()> {
        self.enter("delete_persona")?;
        self.personas.lock().unwrap().retain(|r| !r.matches(persona_id.as_str()));
        self.histories.lock().unwrap().remove(persona_id.as_str());
        Ok(())
    }

    async fn send_message(&self, request: &SendMessage) -> ApiResult<String> {
        if let Some(hook) = self.on_send.lock().unwrap().as_ref() {
            hook();
        }
        self.enter("send_message")?;
        self.sent.lock().unwrap().push(request.clone());
        let reply = self.reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| format!("you said: {}", request.message));
        Ok(reply)
    }

    async fn get_history(
        &self,
        _identity: &str,
        persona_id: &PersonaId
    ) -> ApiResult<Vec<HistoryEntry>> {
        self.enter("get_history")?;
        Ok(self.histories.lock().unwrap().get(persona_id.as_str()).cloned().unwrap_or_default())
    }

    async fn delete_chat_history(&self, _identity: &str, persona_id: &PersonaId) -> ApiResult<()> {
        self.enter("delete_chat")?;
        self.histories.lock().unwrap().remove(persona_id.as_str());
        Ok(())
    }

    async fn request_analysis(
        &self,
        _identity: &str,
        _persona_id: &PersonaId,
        transcript: &str
    ) -> ApiResult<Vec<Recommendation>> {
        self.enter("suggest")?;
        self.transcripts.lock().unwrap().push(transcript.to_string());
        Ok(self.recommendations.lock().unwrap().clone())
    }

    async fn get_profile(&self, identity: &str) -> ApiResult<Profile> {
        self.enter("get_profile")?;
        Ok(self.profiles.lock().unwrap().get(identity).cloned().unwrap_or_default())
    }

    async fn update_profile(&self, identity: &str, profile: &Profile) -> ApiResult<()> {
        self.enter("update_profile")?;
        self.profiles.lock().unwrap().insert(identity.to_string(), profile.clone());
        Ok(())
    }
}
