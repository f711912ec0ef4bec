//! Terminal front end that drives the page controllers.

use log::{ debug, info, warn };
use std::error::Error;
use std::io;
use std::sync::Arc;
use tokio::io::{ stdin, AsyncBufReadExt, BufReader, Lines, Stdin };

use crate::api::BackendApi;
use crate::cli::Command;
use crate::models::chat::Message;
use crate::models::persona::PersonaDraft;
use crate::models::Identity;
use crate::notify::NotificationQueue;
use crate::prompt::PersonaTraits;
use crate::session::{ gate, GateDecision, IdentityProvider, Route, SessionStatus };
use crate::storage::SnapshotStore;
use crate::views::chat::{ ChatView, Dialog };
use crate::views::directory::{ DirectoryScreen, DirectoryView };
use crate::views::new_persona::NewPersonaView;

type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

const CHAT_HELP: &str =
    "Commands: /analyze, /clear, /delete, /edit, /back, /quit. Anything else is sent as a message.";

/// Line-oriented stdin reader.
struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompter {
    fn new() -> Self {
        Self { lines: BufReader::new(stdin()).lines() }
    }

    /// `None` once stdin is closed.
    async fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        if !label.is_empty() {
            println!("{}", label);
        }
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_string()))
    }

    /// Keeps `current` when the answer is empty.
    async fn ask_with_default(&mut self, label: &str, current: &str) -> io::Result<Option<String>> {
        let answer = self.ask(&format!("{} [{}]:", label, current)).await?;
        Ok(answer.map(|a| if a.is_empty() { current.to_string() } else { a }))
    }

    async fn confirm(&mut self, label: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{} [y/N]", label)).await?;
        Ok(matches!(answer.as_deref(), Some("y") | Some("Y") | Some("yes")))
    }
}

pub struct App {
    api: Arc<dyn BackendApi>,
    notices: Arc<NotificationQueue>,
    snapshots: Arc<SnapshotStore>,
    identity_provider: Arc<dyn IdentityProvider>,
    prompter: Prompter,
}

impl App {
    pub fn new(
        api: Arc<dyn BackendApi>,
        snapshots: Arc<SnapshotStore>,
        identity_provider: Arc<dyn IdentityProvider>
    ) -> Self {
        Self {
            api,
            notices: Arc::new(NotificationQueue::new()),
            snapshots,
            identity_provider,
            prompter: Prompter::new(),
        }
    }

    fn flush_notices(&self) {
        for notice in self.notices.drain() {
            let marker = if notice.is_destructive() { "!" } else { "*" };
            println!("{} {}: {}", marker, notice.title, notice.description);
        }
    }

    pub async fn run(&mut self, start: Route, command: Option<Command>) -> AppResult<()> {
        let status = self.identity_provider.resolve().await;
        let mut next = Some(start);
        let mut profile_first = command == Some(Command::Profile);

        while let Some(route) = next.take() {
            next = match gate(&route, &status) {
                GateDecision::Loading => None,
                GateDecision::Redirect(target) => {
                    debug!("Redirecting {} -> {}", route, target);
                    Some(target)
                }
                GateDecision::RenderAnonymous => {
                    println!("You are signed out. Set WINGMAN_USER (or pass --user) to sign in.");
                    None
                }
                GateDecision::Render(identity) =>
                    match route {
                        Route::Entry => None,
                        Route::Directory => {
                            let edit_profile = std::mem::take(&mut profile_first);
                            self.directory_page(&identity, edit_profile).await?
                        }
                        Route::NewPersona => self.new_persona_page(&identity).await?,
                        Route::Chat(_) => self.chat_page(route.clone(), &status).await?,
                    }
            };
        }
        info!("Goodbye");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Directory
    // ---------------------------------------------------------------------

    async fn directory_page(&mut self, identity: &Identity, edit_profile: bool) -> AppResult<Option<Route>> {
        let mut view = DirectoryView::new(
            self.api.clone(),
            self.notices.clone(),
            Some(self.snapshots.clone())
        );
        view.set_identity(Some(identity.clone()));
        view.initialize().await;
        self.flush_notices();

        let first = identity.first_name();
        println!("Welcome{}{}!", if first.is_empty() { "" } else { ", " }, first);
        if edit_profile {
            self.profile_dialog(&mut view).await?;
        }

        loop {
            let cards = match view.screen() {
                DirectoryScreen::Loading => Vec::new(),
                DirectoryScreen::Empty { action } => {
                    println!("You have no personas yet. [n] {}", action);
                    Vec::new()
                }
                DirectoryScreen::Personas { cards, count_label } => {
                    println!("Your personas ({}):", count_label);
                    for (i, card) in cards.iter().enumerate() {
                        println!("  [{}] {} - {}", i + 1, card.persona.name, card.persona.description);
                    }
                    cards
                }
            };
            let label = format!(
                "Pick a number, [n] new persona, [p] {}, [q] quit:",
                view.profile_action_label()
            );
            let Some(answer) = self.prompter.ask(&label).await? else {
                return Ok(None);
            };
            match answer.as_str() {
                "q" => {
                    return Ok(None);
                }
                "n" => view.create_persona(),
                "p" => self.profile_dialog(&mut view).await?,
                other =>
                    match other.parse::<usize>().ok().and_then(|n| cards.get(n.wrapping_sub(1))) {
                        Some(card) => view.select_persona(&card.persona),
                        None => println!("Unknown choice '{}'", other),
                    }
            }
            if let Some(route) = view.navigation_mut().take() {
                return Ok(Some(route));
            }
        }
    }

    async fn profile_dialog(&mut self, view: &mut DirectoryView) -> AppResult<()> {
        view.open_profile();
        while view.is_profile_open() {
            let current = view.profile().clone();
            let p = &mut self.prompter;
            let (Some(name), Some(bio), Some(goals), Some(interests), Some(style)) = (
                p.ask_with_default("Name", &current.name).await?,
                p.ask_with_default("Bio", &current.bio).await?,
                p.ask_with_default("Goals", &current.goals).await?,
                p.ask_with_default("Interests", &current.interests).await?,
                p.ask_with_default("Communication style", &current.communication_style).await?,
            ) else {
                view.close_profile();
                return Ok(());
            };
            {
                let profile = view.profile_mut();
                profile.name = name;
                profile.bio = bio;
                profile.goals = goals;
                profile.interests = interests;
                profile.communication_style = style;
            }
            view.save_profile().await;
            self.flush_notices();
            if view.is_profile_open() && !self.prompter.confirm("Try again?").await? {
                view.close_profile();
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // New persona
    // ---------------------------------------------------------------------

    async fn fill_draft(&mut self, draft: &PersonaDraft) -> io::Result<Option<PersonaDraft>> {
        let p = &mut self.prompter;
        let (Some(name), Some(description), Some(traits), Some(interests), Some(style), Some(previous)) = (
            p.ask_with_default("Name", &draft.name).await?,
            p.ask_with_default("Description", &draft.description).await?,
            p.ask_with_default("Personality traits", &draft.traits.traits).await?,
            p.ask_with_default("Interests", &draft.traits.interests).await?,
            p.ask_with_default("Writing style", &draft.traits.writing_style).await?,
            p.ask_with_default("Previous chat (optional)", &draft.previous_chat).await?,
        ) else {
            return Ok(None);
        };
        Ok(
            Some(PersonaDraft {
                name,
                description,
                traits: PersonaTraits::new(traits, interests, style),
                previous_chat: previous,
            })
        )
    }

    async fn new_persona_page(&mut self, identity: &Identity) -> AppResult<Option<Route>> {
        let mut view = NewPersonaView::new(
            self.api.clone(),
            self.notices.clone(),
            Some(self.snapshots.clone())
        );
        println!("Create a new persona");
        loop {
            let Some(draft) = self.fill_draft(view.form()).await? else {
                return Ok(None);
            };
            *view.form_mut() = draft;
            let created = view.submit(identity).await;
            self.flush_notices();
            if created.is_some() {
                return Ok(view.navigation_mut().take());
            }
            if !self.prompter.confirm("Try again?").await? {
                return Ok(Some(Route::Directory));
            }
        }
    }

    // ---------------------------------------------------------------------
    // Chat
    // ---------------------------------------------------------------------

    fn print_message(view: &ChatView, message: &Message) {
        let speaker = if message.is_user() {
            "You".to_string()
        } else {
            view.persona()
                .map(|p| p.name.clone())
                .unwrap_or_default()
        };
        println!("{}: {}", speaker, message.content);
        if let Some(rec) = view.recommendation_for(message) {
            println!("    {} {}", rec.badge(), rec.suggestion);
            if !rec.next_move.is_empty() {
                println!("    next: {}", rec.next_move);
            }
        }
    }

    fn print_transcript(view: &ChatView) {
        for message in view.messages() {
            Self::print_message(view, message);
        }
    }

    async fn chat_page(&mut self, route: Route, status: &SessionStatus) -> AppResult<Option<Route>> {
        let Route::Chat(persona_id) = route else {
            return Ok(None);
        };
        match self.snapshots.last_persona() {
            Ok(Some(snapshot)) if snapshot.id == persona_id => {
                println!("Opening {}...", snapshot.name);
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read persona snapshot: {}", e),
        }
        let mut view = ChatView::new(self.api.clone(), self.notices.clone());
        view.open(persona_id);
        view.sync(status).await;
        self.flush_notices();
        if let Some(route) = view.navigation_mut().take() {
            return Ok(Some(route));
        }

        if let (Some(persona), Some(display)) = (view.persona(), view.traits_display()) {
            println!("== {} ==\n{}", persona.name, persona.description);
            println!("Traits: {}", display.traits);
            println!("Interests: {}", display.interests);
            println!("Writing style: {}", display.writing_style);
        }
        println!("{}", CHAT_HELP);
        Self::print_transcript(&view);

        loop {
            let Some(line) = self.prompter.ask("").await? else {
                view.teardown();
                return Ok(None);
            };
            match line.as_str() {
                "" => {}
                "/quit" => {
                    view.teardown();
                    return Ok(None);
                }
                "/back" => {
                    view.teardown();
                    return Ok(Some(Route::Directory));
                }
                "/analyze" => {
                    view.toggle_analysis().await;
                    Self::print_transcript(&view);
                }
                "/clear" => {
                    view.open_dialog(Dialog::ClearChat);
                    if self.prompter.confirm("Clear the whole chat history?").await? {
                        view.confirm_clear().await;
                        Self::print_transcript(&view);
                    } else {
                        view.close_dialog();
                    }
                }
                "/delete" => {
                    view.open_dialog(Dialog::DeletePersona);
                    if self.prompter.confirm("Delete this persona permanently?").await? {
                        view.confirm_delete().await;
                    } else {
                        view.close_dialog();
                    }
                }
                "/edit" => {
                    view.open_dialog(Dialog::EditPersona);
                    while view.dialog() == Dialog::EditPersona {
                        match self.fill_draft(view.edit_form()).await? {
                            Some(draft) => {
                                *view.edit_form_mut() = draft;
                                view.submit_edit().await;
                                self.flush_notices();
                                if
                                    view.dialog() == Dialog::EditPersona &&
                                    !self.prompter.confirm("Try again?").await?
                                {
                                    view.close_dialog();
                                }
                            }
                            None => view.close_dialog(),
                        }
                    }
                }
                "/help" => println!("{}", CHAT_HELP),
                _ => {
                    view.set_input(line);
                    if view.send_message().await {
                        if let Some(reply) = view.messages().last() {
                            Self::print_message(&view, reply);
                        }
                    }
                }
            }
            self.flush_notices();
            if let Some(route) = view.navigation_mut().take() {
                view.teardown();
                return Ok(Some(route));
            }
        }
    }
}
