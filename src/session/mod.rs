//! Session resolution and route gating.
//!
//! Pages never fetch until the identity is resolved. The gate below is the
//! only place that decides between rendering, waiting and redirecting.

use async_trait::async_trait;
use log::{ debug, info };
use std::fmt;

use crate::models::persona::PersonaId;
use crate::models::Identity;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated(Identity),
    Unauthenticated,
}

impl SessionStatus {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionStatus::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in page.
    Entry,
    Directory,
    NewPersona,
    Chat(PersonaId),
}

impl Route {
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Entry)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Entry => "/".to_string(),
            Route::Directory => "/personas".to_string(),
            Route::NewPersona => "/newPersona".to_string(),
            Route::Chat(id) => format!("/chat/{}", id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Identity still resolving: show a spinner, fetch nothing.
    Loading,
    Render(Identity),
    /// Unauthenticated visitor on the entry page.
    RenderAnonymous,
    Redirect(Route),
}

pub fn gate(route: &Route, status: &SessionStatus) -> GateDecision {
    let decision = match (status, route) {
        (SessionStatus::Loading, _) => GateDecision::Loading,
        (SessionStatus::Authenticated(_), Route::Entry) => GateDecision::Redirect(Route::NewPersona),
        (SessionStatus::Authenticated(identity), _) => GateDecision::Render(identity.clone()),
        (SessionStatus::Unauthenticated, route) if route.is_protected() =>
            GateDecision::Redirect(Route::Entry),
        (SessionStatus::Unauthenticated, _) => GateDecision::RenderAnonymous,
    };
    debug!("Gate for {}: {:?}", route, decision);
    decision
}

/// Resolves the signed-in identity. The OAuth flow itself lives elsewhere.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self) -> SessionStatus;
}

/// Identity handed over by configuration, already authenticated upstream.
#[derive(Clone, Debug)]
pub struct ConfiguredIdentity {
    identity: Option<Identity>,
}

impl ConfiguredIdentity {
    pub fn new(key: Option<String>, display_name: Option<String>) -> Self {
        let identity = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| {
                let identity = Identity::new(k);
                match display_name.filter(|n| !n.trim().is_empty()) {
                    Some(name) => identity.with_display_name(name),
                    None => identity,
                }
            });
        Self { identity }
    }
}

#[async_trait]
impl IdentityProvider for ConfiguredIdentity {
    async fn resolve(&self) -> SessionStatus {
        match &self.identity {
            Some(identity) => {
                info!("Signed in as {}", identity.key);
                SessionStatus::Authenticated(identity.clone())
            }
            None => SessionStatus::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in() -> SessionStatus {
        SessionStatus::Authenticated(Identity::new("a@x.com"))
    }

    #[test]
    fn test_loading_never_renders() {
        for route in [Route::Entry, Route::Directory, Route::NewPersona, Route::Chat("p".into())] {
            assert_eq!(gate(&route, &SessionStatus::Loading), GateDecision::Loading);
        }
    }

    #[test]
    fn test_authenticated_entry_goes_to_creation() {
        assert_eq!(gate(&Route::Entry, &signed_in()), GateDecision::Redirect(Route::NewPersona));
        assert!(matches!(gate(&Route::NewPersona, &signed_in()), GateDecision::Render(_)));
    }

    #[test]
    fn test_anonymous_protected_goes_to_entry() {
        let anon = SessionStatus::Unauthenticated;
        assert_eq!(gate(&Route::Chat("p".into()), &anon), GateDecision::Redirect(Route::Entry));
        assert_eq!(gate(&Route::NewPersona, &anon), GateDecision::Redirect(Route::Entry));
        assert_eq!(gate(&Route::Entry, &anon), GateDecision::RenderAnonymous);
    }

    #[test]
    fn test_redirects_never_loop() {
        let routes = [Route::Entry, Route::Directory, Route::NewPersona, Route::Chat("p".into())];
        for status in [signed_in(), SessionStatus::Unauthenticated] {
            for route in &routes {
                if let GateDecision::Redirect(target) = gate(route, &status) {
                    assert!(
                        !matches!(gate(&target, &status), GateDecision::Redirect(_)),
                        "{} redirected twice",
                        route
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn test_configured_identity() {
        let provider = ConfiguredIdentity::new(Some("a@x.com".into()), Some("Sam Doe".into()));
        let status = provider.resolve().await;
        let identity = status.identity().unwrap();
        assert_eq!(identity.key, "a@x.com");
        assert_eq!(identity.first_name(), "Sam");

        let blank = ConfiguredIdentity::new(Some("  ".into()), None);
        assert_eq!(blank.resolve().await, SessionStatus::Unauthenticated);
    }
}
