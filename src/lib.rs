pub mod api;
pub mod app;
pub mod cli;
pub mod history;
pub mod models;
pub mod notify;
pub mod prompt;
pub mod session;
pub mod state;
pub mod storage;
pub mod views;

use app::App;
use cli::Args;
use log::info;
use session::ConfiguredIdentity;
use std::error::Error;
use std::sync::Arc;
use storage::SnapshotStore;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Backend URL: {}", args.backend_url);
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("Signed-in User: {}", args.user.as_deref().unwrap_or("<none>"));
    info!("Snapshot Path: {}", args.data_path.display());
    info!("-------------------------");

    let api = api::new_client(&args.backend_config())?;
    let snapshots = Arc::new(SnapshotStore::new(args.data_path.clone()));
    let identity = Arc::new(ConfiguredIdentity::new(args.user.clone(), args.display_name.clone()));

    let mut app = App::new(api, snapshots, identity);
    app.run(args.start_route(), args.command.clone()).await?;

    Ok(())
}
