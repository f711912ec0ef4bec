//! Headless page controllers.
//!
//! Each view owns the state of one page visit. Async actions take `&mut self`
//! and run to completion on the caller's task; anything that must survive a
//! torn-down view checks the view's [`MountGuard`](crate::state::MountGuard)
//! after every backend call.

pub mod analysis;
pub mod chat;
pub mod directory;
pub mod new_persona;

use log::debug;

use crate::session::Route;

/// Pending navigation requested by a view; the front end consumes it.
#[derive(Debug, Default)]
pub struct Navigation {
    target: Option<Route>,
}

impl Navigation {
    pub fn push(&mut self, route: Route) {
        debug!("Navigating to {}", route);
        self.target = Some(route);
    }

    pub fn take(&mut self) -> Option<Route> {
        self.target.take()
    }
}
