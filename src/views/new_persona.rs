//! Persona creation form.

use log::{ error, info, warn };
use std::sync::Arc;
use thiserror::Error;

use super::Navigation;
use crate::api::BackendApi;
use crate::models::persona::{ PersonaDraft, PersonaId };
use crate::models::Identity;
use crate::notify::{ Notification, Notifier };
use crate::session::Route;
use crate::state::MountGuard;
use crate::storage::{ PersonaSnapshot, SnapshotStore };

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_DESCRIPTION_LEN: usize = 2;
pub const MIN_DETAIL_LEN: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be at least {min} characters.")] TooShort {
        field: &'static str,
        min: usize,
    },

    #[error("{field} cannot contain the reserved text '{marker}'.")] ReservedMarker {
        field: &'static str,
        marker: &'static str,
    },
}

fn check_len(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.trim().chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(())
}

/// Checks the form in display order and reports the first problem.
pub fn validate(draft: &PersonaDraft) -> Result<(), ValidationError> {
    check_len("Name", &draft.name, MIN_NAME_LEN)?;
    check_len("Description", &draft.description, MIN_DESCRIPTION_LEN)?;
    check_len("Traits", &draft.traits.traits, MIN_DETAIL_LEN)?;
    check_len("Interests", &draft.traits.interests, MIN_DETAIL_LEN)?;
    check_len("Writing style", &draft.traits.writing_style, MIN_DETAIL_LEN)?;
    if let Some(marker) = draft.traits.marker_collision() {
        return Err(ValidationError::ReservedMarker { field: "Persona details", marker: marker.trim() });
    }
    Ok(())
}

pub struct NewPersonaView {
    api: Arc<dyn BackendApi>,
    notifier: Arc<dyn Notifier>,
    snapshots: Option<Arc<SnapshotStore>>,
    guard: MountGuard,
    form: PersonaDraft,
    submitting: bool,
    navigation: Navigation,
}

impl NewPersonaView {
    pub fn new(
        api: Arc<dyn BackendApi>,
        notifier: Arc<dyn Notifier>,
        snapshots: Option<Arc<SnapshotStore>>
    ) -> Self {
        Self {
            api,
            notifier,
            snapshots,
            guard: MountGuard::new(),
            form: PersonaDraft::default(),
            submitting: false,
            navigation: Navigation::default(),
        }
    }

    pub fn form(&self) -> &PersonaDraft {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PersonaDraft {
        &mut self.form
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn teardown(&self) {
        self.guard.teardown();
    }

    /// Creates the persona and navigates to its chat. The form is kept on failure.
    pub async fn submit(&mut self, identity: &Identity) -> Option<PersonaId> {
        if self.submitting {
            return None;
        }
        if let Err(e) = validate(&self.form) {
            self.notifier.notify(Notification::error("Invalid Persona", e.to_string()));
            return None;
        }

        self.submitting = true;
        let draft = self.form.clone();
        let result = self.api.create_persona(&identity.key, &draft).await;
        if !self.guard.is_mounted() {
            return None;
        }
        self.submitting = false;

        match result {
            Ok(id) => {
                info!("Created persona {} ({})", draft.name, id);
                if let Some(store) = &self.snapshots {
                    let snapshot = PersonaSnapshot::from_draft(id.clone(), &draft);
                    if let Err(e) = store.remember_persona(&snapshot) {
                        warn!("Could not store persona snapshot: {}", e);
                    }
                }
                self.navigation.push(Route::Chat(id.clone()));
                Some(id)
            }
            Err(e) => {
                error!("Failed to create persona: {}", e);
                self.notifier.notify(
                    Notification::error("Error", "Failed to create persona. Please try again.")
                );
                None
            }
        }
    }

    pub fn navigation_mut(&mut self) -> &mut Navigation {
        &mut self.navigation
    }
}
