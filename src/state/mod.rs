//! Request bookkeeping shared by the views.
//!
//! Every fetch a view performs is tracked by a [`RequestSlot`] keyed by the
//! (identity, entity) pair it was issued for, so a repeated trigger for an
//! already loading or loaded pair is a no-op and a key change starts over.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub identity: String,
    pub entity: String,
}

impl RequestKey {
    pub fn new(identity: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            entity: entity.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Default)]
pub struct RequestSlot {
    key: Option<RequestKey>,
    state: RequestState,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_loaded_for(&self, key: &RequestKey) -> bool {
        self.key.as_ref() == Some(key) && self.state == RequestState::Loaded
    }

    /// Claims the slot for `key`. Returns `false` when a fetch for the same key
    /// is already running or has completed.
    pub fn begin(&mut self, key: &RequestKey) -> bool {
        if self.key.as_ref() == Some(key)
            && matches!(self.state, RequestState::Loading | RequestState::Loaded)
        {
            return false;
        }
        self.key = Some(key.clone());
        self.state = RequestState::Loading;
        true
    }

    /// Records the outcome, unless the slot was re-keyed while the fetch ran.
    pub fn finish(&mut self, key: &RequestKey, ok: bool) -> bool {
        if self.key.as_ref() != Some(key) {
            return false;
        }
        self.state = if ok { RequestState::Loaded } else { RequestState::Failed };
        true
    }

    pub fn reset(&mut self) {
        self.key = None;
        self.state = RequestState::Idle;
    }
}

/// Shared flag telling in-flight completions whether their view still exists.
#[derive(Clone, Debug)]
pub struct MountGuard {
    mounted: Arc<AtomicBool>,
}

impl MountGuard {
    pub fn new() -> Self {
        Self { mounted: Arc::new(AtomicBool::new(true)) }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn teardown(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}
