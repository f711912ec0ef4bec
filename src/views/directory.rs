//! Persona directory and profile editor.

use futures::future::{ abortable, AbortHandle, Abortable, Aborted, BoxFuture };
use futures::FutureExt;
use log::{ debug, error, info, warn };
use std::sync::Arc;

use super::Navigation;
use crate::api::{ ApiResult, BackendApi };
use crate::models::persona::{ Persona, PersonaRecord };
use crate::models::profile::Profile;
use crate::models::Identity;
use crate::notify::{ Notification, Notifier };
use crate::session::Route;
use crate::state::{ MountGuard, RequestKey, RequestSlot, RequestState };
use crate::storage::{ PersonaSnapshot, SnapshotStore };

const DIRECTORY_ENTITY: &str = "directory";

type InitResult = (ApiResult<Vec<PersonaRecord>>, ApiResult<Profile>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonaCard {
    pub persona: Persona,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryScreen {
    Loading,
    Empty {
        action: &'static str,
    },
    Personas {
        cards: Vec<PersonaCard>,
        count_label: String,
    },
}

pub fn count_label(count: usize) -> String {
    if count == 1 { "1 persona".to_string() } else { format!("{} personas", count) }
}

/// Directory initialization that has been started but not yet awaited.
pub struct PendingInit {
    key: RequestKey,
    work: Abortable<BoxFuture<'static, InitResult>>,
}

pub struct InitOutcome {
    key: RequestKey,
    result: Result<InitResult, Aborted>,
}

impl PendingInit {
    pub async fn run(self) -> InitOutcome {
        InitOutcome {
            key: self.key,
            result: self.work.await,
        }
    }
}

pub struct DirectoryView {
    api: Arc<dyn BackendApi>,
    notifier: Arc<dyn Notifier>,
    snapshots: Option<Arc<SnapshotStore>>,
    guard: MountGuard,
    identity: Option<Identity>,
    init: RequestSlot,
    abort: Option<AbortHandle>,
    personas: Vec<Persona>,
    profile: Profile,
    new_user: bool,
    profile_open: bool,
    saving_profile: bool,
    navigation: Navigation,
}

impl DirectoryView {
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
            identity: None,
            init: RequestSlot::new(),
            abort: None,
            personas: Vec::new(),
            profile: Profile::default(),
            new_user: false,
            profile_open: false,
            saving_profile: false,
            navigation: Navigation::default(),
        }
    }

    /// Switching identity aborts any initialization still in flight.
    pub fn set_identity(&mut self, identity: Option<Identity>) {
        if self.identity.as_ref().map(|i| &i.key) == identity.as_ref().map(|i| &i.key) {
            self.identity = identity;
            return;
        }
        if let Some(handle) = self.abort.take() {
            debug!("Aborting directory initialization for previous identity");
            handle.abort();
        }
        self.init.reset();
        self.personas.clear();
        self.profile = Profile::default();
        self.new_user = false;
        self.profile_open = false;
        self.identity = identity;
    }

    pub fn teardown(&mut self) {
        self.guard.teardown();
        if let Some(handle) = self.abort.take() {
            handle.abort();
        }
    }

    /// Starts fetching personas and profile together. Returns `None` when the
    /// current identity is already loaded or loading.
    pub fn start_initialize(&mut self) -> Option<PendingInit> {
        let identity = self.identity.as_ref()?;
        let key = RequestKey::new(identity.key.clone(), DIRECTORY_ENTITY);
        if !self.init.begin(&key) {
            return None;
        }

        let api = self.api.clone();
        let user = key.identity.clone();
        let work = (async move {
            let personas = api.list_personas(&user);
            let profile = api.get_profile(&user);
            futures::join!(personas, profile)
        }).boxed();
        let (work, handle) = abortable(work);
        self.abort = Some(handle);
        Some(PendingInit { key, work })
    }

    /// Applies a finished initialization. Persona and profile outcomes are
    /// independent. A profile fetch that fails or returns an empty record (`{}`)
    /// both mean a new user: the backend answers `{}` for unknown identities,
    /// so an empty record is not treated as an existing profile.
    pub fn finish_initialize(&mut self, outcome: InitOutcome) {
        if !self.guard.is_mounted() {
            return;
        }
        let Ok((personas, profile)) = outcome.result else {
            debug!("Directory initialization for {} was aborted", outcome.key.identity);
            return;
        };
        if !self.init.finish(&outcome.key, true) {
            debug!("Ignoring directory results for stale identity {}", outcome.key.identity);
            return;
        }
        self.abort = None;

        self.personas = match personas {
            Ok(records) => {
                let personas: Vec<Persona> = records
                    .into_iter()
                    .filter_map(PersonaRecord::into_persona)
                    .collect();
                info!("Loaded {} personas for {}", personas.len(), outcome.key.identity);
                personas
            }
            Err(e) => {
                error!("Failed to fetch personas: {}", e);
                Vec::new()
            }
        };

        let display_name = self.identity
            .as_ref()
            .map(|i| i.display_name().to_string())
            .unwrap_or_default();
        match profile {
            Ok(profile) if !profile.is_empty() => {
                let mut profile = profile;
                if profile.name.trim().is_empty() {
                    profile.name = display_name;
                }
                self.profile = profile;
                self.new_user = false;
            }
            Ok(_) => {
                debug!("No profile stored for {}", outcome.key.identity);
                self.profile = Profile::seeded_with_name(display_name);
                self.new_user = true;
            }
            Err(e) => {
                warn!("Failed to fetch profile, treating as new user: {}", e);
                self.profile = Profile::seeded_with_name(display_name);
                self.new_user = true;
            }
        }
    }

    pub async fn initialize(&mut self) {
        if let Some(pending) = self.start_initialize() {
            let outcome = pending.run().await;
            self.finish_initialize(outcome);
        }
    }

    pub fn screen(&self) -> DirectoryScreen {
        if self.identity.is_none() || self.init.state() != RequestState::Loaded {
            return DirectoryScreen::Loading;
        }
        let cards: Vec<PersonaCard> = self.personas
            .iter()
            .filter(|p| !p.name.trim().is_empty())
            .map(|p| PersonaCard { persona: p.clone() })
            .collect();
        if cards.is_empty() {
            return DirectoryScreen::Empty { action: "Create Your First Persona" };
        }
        DirectoryScreen::Personas {
            count_label: count_label(cards.len()),
            cards,
        }
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    /// Writes the local snapshot and navigates to the persona's chat.
    pub fn select_persona(&mut self, persona: &Persona) {
        if let Some(store) = &self.snapshots {
            if let Err(e) = store.remember_persona(&PersonaSnapshot::from_persona(persona)) {
                warn!("Could not store persona snapshot: {}", e);
            }
        }
        self.navigation.push(Route::Chat(persona.id.clone()));
    }

    pub fn create_persona(&mut self) {
        self.navigation.push(Route::NewPersona);
    }

    // ---------------------------------------------------------------------
    // Profile
    // ---------------------------------------------------------------------

    pub fn is_new_user(&self) -> bool {
        self.new_user
    }

    pub fn profile_action_label(&self) -> &'static str {
        if self.new_user { "Complete Profile" } else { "Update Profile" }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    pub fn open_profile(&mut self) {
        self.profile_open = true;
    }

    pub fn close_profile(&mut self) {
        self.profile_open = false;
    }

    pub fn is_profile_open(&self) -> bool {
        self.profile_open
    }

    pub fn is_saving_profile(&self) -> bool {
        self.saving_profile
    }

    pub async fn save_profile(&mut self) {
        if self.saving_profile {
            return;
        }
        let Some(identity) = self.identity.clone() else {
            return;
        };
        self.saving_profile = true;
        let profile = self.profile.clone();
        let result = self.api.update_profile(&identity.key, &profile).await;
        if !self.guard.is_mounted() {
            return;
        }

        match result {
            Ok(()) => {
                info!("Saved profile for {}", identity.key);
                self.profile_open = false;
                self.new_user = false;
                self.notifier.notify(
                    Notification::info("Profile Updated", "Your profile has been saved.")
                );
            }
            Err(e) => {
                error!("Failed to save profile: {}", e);
                self.notifier.notify(
                    Notification::error("Error", "Failed to save profile. Please try again.")
                );
            }
        }
        self.saving_profile = false;
    }

    pub fn navigation_mut(&mut self) -> &mut Navigation {
        &mut self.navigation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockBackend;
    use crate::notify::NotificationQueue;
    use crate::storage::PERSONA_KEY;
    use serde_json::json;
    use tempfile::tempdir;

    fn sam() -> Identity {
        Identity::new("a@x.com").with_display_name("Sam Doe")
    }

    fn view_for(backend: &Arc<MockBackend>) -> (Arc<NotificationQueue>, DirectoryView) {
        let notices = Arc::new(NotificationQueue::new());
        let mut view = DirectoryView::new(backend.clone(), notices.clone(), None);
        view.set_identity(Some(sam()));
        (notices, view)
    }

    #[tokio::test]
    async fn test_cards_and_count() {
        let backend = Arc::new(
            MockBackend::new().with_persona("p1", "Alex", "").with_persona("p2", "Bo", "")
        );
        let (_, mut view) = view_for(&backend);
        assert_eq!(view.screen(), DirectoryScreen::Loading);
        view.initialize().await;

        match view.screen() {
            DirectoryScreen::Personas { cards, count_label } => {
                assert_eq!(count_label, "2 personas");
                let names: Vec<&str> = cards
                    .iter()
                    .map(|c| c.persona.name.as_str())
                    .collect();
                assert_eq!(names, vec!["Alex", "Bo"]);
            }
            other => panic!("unexpected screen {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nameless_entries_are_skipped() {
        let backend = Arc::new(MockBackend::new().with_persona("p1", "Alex", ""));
        backend.personas
            .lock()
            .unwrap()
            .push(serde_json::from_value(json!({ "persona_id": "p2" })).unwrap());
        let (_, mut view) = view_for(&backend);
        view.initialize().await;
        match view.screen() {
            DirectoryScreen::Personas { cards, .. } => assert_eq!(cards.len(), 1),
            other => panic!("unexpected screen {:?}", other),
        }
        assert_eq!(count_label(1), "1 persona");
    }

    #[tokio::test]
    async fn test_initializes_once_per_identity() {
        let backend = Arc::new(MockBackend::new());
        let (_, mut view) = view_for(&backend);
        view.initialize().await;
        view.initialize().await;
        assert_eq!(backend.call_count("list_personas"), 1);
        assert_eq!(backend.call_count("get_profile"), 1);

        view.set_identity(Some(Identity::new("b@x.com")));
        view.initialize().await;
        assert_eq!(backend.call_count("list_personas"), 2);
    }

    #[tokio::test]
    async fn test_identity_change_aborts_pending_init() {
        let backend = Arc::new(MockBackend::new().with_persona("p1", "Alex", ""));
        let (_, mut view) = view_for(&backend);
        let pending = view.start_initialize().expect("init started");

        view.set_identity(Some(Identity::new("b@x.com")));
        let outcome = pending.run().await;
        assert!(outcome.result.is_err());
        view.finish_initialize(outcome);
        assert!(view.personas().is_empty());
        assert_eq!(view.screen(), DirectoryScreen::Loading);
        assert_eq!(backend.call_count("list_personas"), 0);
    }

    #[tokio::test]
    async fn test_partial_failures_are_independent() {
        let backend = Arc::new(
            MockBackend::new()
                .with_persona("p1", "Alex", "")
                .with_profile("a@x.com", Profile { bio: "climber".into(), ..Profile::default() })
        );
        backend.fail("get_profile");
        let (_, mut view) = view_for(&backend);
        view.initialize().await;
        assert_eq!(view.personas().len(), 1);
        assert!(view.is_new_user());
        assert_eq!(view.profile(), &Profile::seeded_with_name("Sam Doe"));
        assert_eq!(view.profile_action_label(), "Complete Profile");

        let backend = Arc::new(MockBackend::new());
        backend.fail("list_personas");
        let (_, mut view) = view_for(&backend);
        view.initialize().await;
        assert!(matches!(view.screen(), DirectoryScreen::Empty { .. }));
    }

    #[tokio::test]
    async fn test_existing_profile_falls_back_to_display_name() {
        let backend = Arc::new(
            MockBackend::new().with_profile("a@x.com", Profile { goals: "be funnier".into(), ..Profile::default() })
        );
        let (_, mut view) = view_for(&backend);
        view.initialize().await;
        assert!(!view.is_new_user());
        assert_eq!(view.profile().name, "Sam Doe");
        assert_eq!(view.profile().goals, "be funnier");
        assert_eq!(view.profile_action_label(), "Update Profile");
    }

    #[tokio::test]
    async fn test_save_profile() {
        let backend = Arc::new(MockBackend::new());
        let (notices, mut view) = view_for(&backend);
        view.initialize().await;
        view.open_profile();
        view.profile_mut().bio = "likes hiking".into();

        backend.fail("update_profile");
        view.save_profile().await;
        assert!(view.is_profile_open());
        assert!(view.is_new_user());
        assert!(notices.drain()[0].is_destructive());

        backend.recover("update_profile");
        view.save_profile().await;
        assert!(!view.is_profile_open());
        assert!(!view.is_new_user());
        assert!(!view.is_saving_profile());
        assert_eq!(backend.profiles.lock().unwrap()["a@x.com"].bio, "likes hiking");
    }

    #[tokio::test]
    async fn test_select_writes_snapshot() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SnapshotStore::new(dir.path().join("state.json")));
        let backend = Arc::new(MockBackend::new().with_persona("p1", "Alex", ""));
        let mut view = DirectoryView::new(
            backend.clone(),
            Arc::new(NotificationQueue::new()),
            Some(store.clone())
        );
        view.set_identity(Some(sam()));
        view.initialize().await;

        let persona = view.personas()[0].clone();
        view.select_persona(&persona);
        assert_eq!(view.navigation_mut().take(), Some(Route::Chat(persona.id.clone())));
        let snapshot: PersonaSnapshot = store.get(PERSONA_KEY).unwrap().unwrap();
        assert_eq!(snapshot.name, "Alex");
    }
}
