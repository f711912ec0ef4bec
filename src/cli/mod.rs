use clap::{ Parser, Subcommand };
use std::path::PathBuf;
use std::time::Duration;

use crate::api::BackendConfig;
use crate::models::persona::PersonaId;
use crate::session::Route;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the persona backend (e.g., http://localhost:8000)
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8000")]
    pub backend_url: String,

    /// Timeout in seconds for each backend request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    // --- Identity Args ---
    /// Identity key of the signed-in user (usually an email address). Unset means signed out.
    #[arg(short = 'u', long, env = "WINGMAN_USER")]
    pub user: Option<String>,

    /// Display name shown in greetings and used to seed a new profile.
    #[arg(long, env = "WINGMAN_DISPLAY_NAME")]
    pub display_name: Option<String>,

    // --- General App Args ---
    /// Path to the local snapshot file.
    #[arg(long, env = "WINGMAN_DATA_PATH", default_value = "wingman_state.json")]
    pub data_path: PathBuf,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Browse personas and pick one to chat with.
    Personas,
    /// Create a new persona.
    Create,
    /// Chat with an existing persona.
    Chat {
        persona_id: String,
    },
    /// Edit your profile.
    Profile,
}

impl Args {
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.backend_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Page the command opens; no command lands on the entry page.
    pub fn start_route(&self) -> Route {
        match &self.command {
            None => Route::Entry,
            Some(Command::Personas) | Some(Command::Profile) => Route::Directory,
            Some(Command::Create) => Route::NewPersona,
            Some(Command::Chat { persona_id }) => Route::Chat(PersonaId::new(persona_id.as_str())),
        }
    }
}
