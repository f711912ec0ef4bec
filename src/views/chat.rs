//! Persona detail and chat page.

use log::{ debug, error, info, warn };
use std::sync::Arc;

use super::analysis::{ AnalysisOverlay, AnalysisPhase, Toggle };
use super::Navigation;
use crate::api::{ BackendApi, SendMessage };
use crate::history::{ greeting_messages, messages_from_history };
use crate::models::chat::Message;
use crate::models::persona::{ find_persona, Persona, PersonaDraft, PersonaId };
use crate::models::recommendation::Recommendation;
use crate::models::Identity;
use crate::notify::{ Notification, Notifier };
use crate::session::{ Route, SessionStatus };
use crate::state::{ MountGuard, RequestKey, RequestSlot, RequestState };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Dialog {
    #[default]
    None,
    ClearChat,
    DeletePersona,
    EditPersona,
}

/// Sidebar fields with placeholders for empty values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraitsDisplay {
    pub traits: String,
    pub interests: String,
    pub writing_style: String,
}

fn or_placeholder(value: String, placeholder: &str) -> String {
    if value.trim().is_empty() { placeholder.to_string() } else { value }
}

pub struct ChatView {
    api: Arc<dyn BackendApi>,
    notifier: Arc<dyn Notifier>,
    guard: MountGuard,
    identity: Option<Identity>,
    persona_id: Option<PersonaId>,
    persona: Option<Persona>,
    messages: Vec<Message>,
    input: String,
    sending: bool,
    persona_request: RequestSlot,
    history_request: RequestSlot,
    analysis: AnalysisOverlay,
    edit_form: PersonaDraft,
    dialog: Dialog,
    clearing: bool,
    deleting: bool,
    updating: bool,
    navigation: Navigation,
}

impl ChatView {
    pub fn new(api: Arc<dyn BackendApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            guard: MountGuard::new(),
            identity: None,
            persona_id: None,
            persona: None,
            messages: Vec::new(),
            input: String::new(),
            sending: false,
            persona_request: RequestSlot::new(),
            history_request: RequestSlot::new(),
            analysis: AnalysisOverlay::new(),
            edit_form: PersonaDraft::default(),
            dialog: Dialog::None,
            clearing: false,
            deleting: false,
            updating: false,
            navigation: Navigation::default(),
        }
    }

    // ---------------------------------------------------------------------
    // Page lifecycle
    // ---------------------------------------------------------------------

    /// Points the view at a persona. A different id drops everything loaded.
    pub fn open(&mut self, persona_id: PersonaId) {
        if self.persona_id.as_ref() == Some(&persona_id) {
            return;
        }
        debug!("Chat view switching to persona {}", persona_id);
        self.persona_id = Some(persona_id);
        self.reset_loaded();
    }

    fn set_identity(&mut self, identity: Option<Identity>) {
        let changed = self.identity.as_ref().map(|i| &i.key) != identity.as_ref().map(|i| &i.key);
        self.identity = identity;
        if changed {
            self.reset_loaded();
        }
    }

    fn reset_loaded(&mut self) {
        self.persona_request.reset();
        self.history_request.reset();
        self.persona = None;
        self.messages.clear();
        self.analysis.discard();
        self.dialog = Dialog::None;
    }

    /// Handle for in-flight work that must notice the page going away.
    pub fn guard(&self) -> MountGuard {
        self.guard.clone()
    }

    pub fn teardown(&self) {
        self.guard.teardown();
    }

    /// Brings the page up to date with the session: loads the persona, then its
    /// history, each at most once per (identity, persona) pair.
    pub async fn sync(&mut self, status: &SessionStatus) {
        match status {
            SessionStatus::Loading => {
                return;
            }
            SessionStatus::Unauthenticated => {
                self.set_identity(None);
                self.navigation.push(Route::Entry);
                return;
            }
            SessionStatus::Authenticated(identity) => {
                self.set_identity(Some(identity.clone()));
            }
        }
        if self.persona_id.is_none() {
            self.navigation.push(Route::Directory);
            return;
        }
        if self.load_persona().await {
            self.load_history().await;
        }
    }

    fn request_key(&self) -> Option<RequestKey> {
        match (&self.identity, &self.persona_id) {
            (Some(identity), Some(id)) => Some(RequestKey::new(identity.key.clone(), id.as_str())),
            _ => None,
        }
    }

    /// Returns whether a persona is loaded for the current key afterwards.
    pub async fn load_persona(&mut self) -> bool {
        let Some(key) = self.request_key() else {
            return false;
        };
        if self.persona_request.is_loaded_for(&key) {
            return self.persona.is_some();
        }
        if !self.persona_request.begin(&key) {
            return false;
        }
        let Some(requested) = self.persona_id.clone() else {
            return false;
        };

        let result = self.api.list_personas(&key.identity).await;
        if !self.guard.is_mounted() {
            return false;
        }

        match result {
            Ok(records) =>
                match find_persona(records, &requested) {
                    Some(persona) => {
                        info!("Loaded persona {} ({})", persona.name, persona.id);
                        self.edit_form = PersonaDraft::from_persona(&persona);
                        self.persona = Some(persona);
                        self.persona_request.finish(&key, true)
                    }
                    None => {
                        warn!("Persona {} not found for {}", requested, key.identity);
                        self.persona_request.finish(&key, false);
                        self.notifier.notify(
                            Notification::error(
                                "Persona Not Found",
                                "The requested persona could not be found."
                            )
                        );
                        self.navigation.push(Route::Directory);
                        false
                    }
                }
            Err(e) => {
                error!("Failed to load persona {}: {}", requested, e);
                self.persona_request.finish(&key, false);
                self.notifier.notify(
                    Notification::error("Error", "Could not load persona. Please try again.")
                );
                self.navigation.push(Route::Directory);
                false
            }
        }
    }

    pub async fn load_history(&mut self) {
        let Some(key) = self.request_key() else {
            return;
        };
        let (Some(persona), Some(persona_id)) = (self.persona.clone(), self.persona_id.clone()) else {
            return;
        };
        if !self.history_request.begin(&key) {
            return;
        }

        let result = self.api.get_history(&key.identity, &persona_id).await;
        if !self.guard.is_mounted() {
            return;
        }

        let ok = match result {
            Ok(entries) => {
                debug!("Loaded {} history entries for {}", entries.len(), persona_id);
                self.replace_messages(messages_from_history(entries, &persona.name));
                true
            }
            Err(e) => {
                error!("Failed to load chat history for {}: {}", persona_id, e);
                self.replace_messages(greeting_messages(&persona.name));
                false
            }
        };
        self.history_request.finish(&key, ok);
    }

    fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.analysis.discard();
    }

    // ---------------------------------------------------------------------
    // Sending
    // ---------------------------------------------------------------------

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Returns `true` only when a reply was appended; the new reply is then the
    /// last message.
    pub async fn send_message(&mut self) -> bool {
        if self.input.trim().is_empty() || self.sending {
            return false;
        }
        let (Some(identity), Some(persona), Some(persona_id)) = (
            self.identity.clone(),
            self.persona.clone(),
            self.persona_id.clone(),
        ) else {
            return false;
        };

        let text = std::mem::take(&mut self.input);
        let before = self.messages.clone();
        self.messages.push(Message::user(text.clone()));
        self.sending = true;

        let request = SendMessage {
            identity: identity.key,
            persona_id,
            persona_instructions: persona.chat_history.clone(),
            message: text,
        };
        let result = self.api.send_message(&request).await;
        if !self.guard.is_mounted() {
            return false;
        }

        let replied = match result {
            Ok(reply) => {
                self.messages.push(Message::assistant(reply, &persona.name));
                true
            }
            Err(e) => {
                error!("Error sending message to {}: {}", request.persona_id, e);
                self.notifier.notify(
                    Notification::error(
                        "API Error",
                        "The backend is having trouble responding. Please try again."
                    )
                );
                self.messages = before;
                false
            }
        };
        self.sending = false;
        replied
    }

    // ---------------------------------------------------------------------
    // Analysis
    // ---------------------------------------------------------------------

    pub async fn toggle_analysis(&mut self) {
        let (Some(identity), Some(persona_id)) = (self.identity.clone(), self.persona_id.clone()) else {
            self.notify_not_enough_context();
            return;
        };
        if self.persona.is_none() {
            self.notify_not_enough_context();
            return;
        }

        let ticket = match self.analysis.toggle(&self.messages) {
            Toggle::Hidden => {
                return;
            }
            Toggle::Rejected => {
                self.notify_not_enough_context();
                return;
            }
            Toggle::Started(ticket) => ticket,
        };

        let result = self.api.request_analysis(&identity.key, &persona_id, &ticket.transcript).await;
        if !self.guard.is_mounted() {
            return;
        }

        match result {
            Ok(recommendations) => {
                info!("Received {} recommendations for {}", recommendations.len(), persona_id);
                self.analysis.complete(ticket, recommendations);
            }
            Err(e) => {
                error!("Error with analysis for {}: {}", persona_id, e);
                self.notifier.notify(
                    Notification::error(
                        "Analysis Error",
                        "The backend could not provide suggestions at this time."
                    )
                );
                self.analysis.fail(ticket);
            }
        }
    }

    fn notify_not_enough_context(&self) {
        self.notifier.notify(
            Notification::info("Not enough context", "Send a few more messages before analyzing.")
        );
    }

    // ---------------------------------------------------------------------
    // Clear / delete / edit
    // ---------------------------------------------------------------------

    pub fn open_dialog(&mut self, dialog: Dialog) {
        if dialog == Dialog::EditPersona {
            if let Some(persona) = &self.persona {
                self.edit_form = PersonaDraft::from_persona(persona);
            }
        }
        self.dialog = dialog;
    }

    pub fn close_dialog(&mut self) {
        self.dialog = Dialog::None;
    }

    pub async fn confirm_clear(&mut self) {
        let (Some(identity), Some(persona_id)) = (self.identity.clone(), self.persona_id.clone()) else {
            return;
        };
        self.clearing = true;
        let result = self.api.delete_chat_history(&identity.key, &persona_id).await;
        if !self.guard.is_mounted() {
            return;
        }

        match result {
            Ok(()) => {
                let name = self.persona
                    .as_ref()
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                self.replace_messages(greeting_messages(&name));
                self.notifier.notify(
                    Notification::info("Chat Cleared", "Chat history has been successfully cleared.")
                );
            }
            Err(e) => {
                error!("Failed to clear chat for {}: {}", persona_id, e);
                self.notifier.notify(
                    Notification::error("Error", "Failed to clear chat history. Please try again.")
                );
            }
        }
        self.clearing = false;
        if self.dialog == Dialog::ClearChat {
            self.dialog = Dialog::None;
        }
    }

    pub async fn confirm_delete(&mut self) {
        let (Some(identity), Some(persona_id)) = (self.identity.clone(), self.persona_id.clone()) else {
            return;
        };
        self.deleting = true;
        let result = self.api.delete_persona(&identity.key, &persona_id).await;
        if !self.guard.is_mounted() {
            return;
        }

        match result {
            Ok(()) => {
                info!("Deleted persona {}", persona_id);
                self.notifier.notify(
                    Notification::info("Persona Deleted", "Persona has been successfully deleted.")
                );
                self.navigation.push(Route::Directory);
            }
            Err(e) => {
                error!("Failed to delete persona {}: {}", persona_id, e);
                self.notifier.notify(
                    Notification::error("Error", "Failed to delete persona. Please try again.")
                );
            }
        }
        self.deleting = false;
        if self.dialog == Dialog::DeletePersona {
            self.dialog = Dialog::None;
        }
    }

    pub fn edit_form(&self) -> &PersonaDraft {
        &self.edit_form
    }

    pub fn edit_form_mut(&mut self) -> &mut PersonaDraft {
        &mut self.edit_form
    }

    pub async fn submit_edit(&mut self) {
        let (Some(identity), Some(persona_id)) = (self.identity.clone(), self.persona_id.clone()) else {
            return;
        };
        if let Some(marker) = self.edit_form.traits.marker_collision() {
            self.notifier.notify(
                Notification::error(
                    "Invalid Persona",
                    format!("Fields cannot contain the reserved text '{}'.", marker.trim())
                )
            );
            return;
        }

        self.updating = true;
        let draft = self.edit_form.clone();
        let result = self.api.update_persona(&identity.key, &persona_id, &draft).await;
        if !self.guard.is_mounted() {
            return;
        }

        match result {
            Ok(()) => {
                if let Some(persona) = &self.persona {
                    self.persona = Some(draft.apply_to(persona));
                }
                self.notifier.notify(
                    Notification::info("Persona Updated", "Persona has been successfully updated.")
                );
                if self.dialog == Dialog::EditPersona {
                    self.dialog = Dialog::None;
                }
            }
            Err(e) => {
                error!("Failed to update persona {}: {}", persona_id, e);
                self.notifier.notify(
                    Notification::error("Error", "Failed to update persona. Please try again.")
                );
            }
        }
        self.updating = false;
    }

    // ---------------------------------------------------------------------
    // Read side
    // ---------------------------------------------------------------------

    pub fn persona(&self) -> Option<&Persona> {
        self.persona.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn is_clearing(&self) -> bool {
        self.clearing
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    pub fn dialog(&self) -> Dialog {
        self.dialog
    }

    pub fn persona_state(&self) -> RequestState {
        self.persona_request.state()
    }

    pub fn history_state(&self) -> RequestState {
        self.history_request.state()
    }

    pub fn analysis_phase(&self) -> AnalysisPhase {
        self.analysis.phase()
    }

    pub fn recommendation_for(&self, message: &Message) -> Option<&Recommendation> {
        self.analysis.recommendation_for(message)
    }

    pub fn traits_display(&self) -> Option<TraitsDisplay> {
        let fields = self.persona.as_ref()?.traits();
        Some(TraitsDisplay {
            traits: or_placeholder(fields.traits, "No traits specified"),
            interests: or_placeholder(fields.interests, "No interests specified"),
            writing_style: or_placeholder(fields.writing_style, "No writing style specified"),
        })
    }

    pub fn navigation_mut(&mut self) -> &mut Navigation {
        &mut self.navigation
    }
}
