//! Per-browser-session wizard state and the narrow storage contract the
//! rest of the service depends on.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rand::Rng;

use crate::action::Action;
use crate::plugin::ActionPlugin;

/// Progress through the currently selected action's step wizard.
///
/// `total_steps` and `plugin` are fixed for the duration of one action
/// and recomputed only when the sequencer selects a new action.
#[derive(Clone)]
pub struct CurrentAction {
    pub action: Action,
    /// 1-based step the user is on.
    pub step: u32,
    pub total_steps: u32,
    pub plugin: Arc<dyn ActionPlugin>,
}

/// Wizard state for one authenticated browser session.
///
/// Created when the inbound token verifies, mutated by the sequencer on
/// each step transition.
#[derive(Clone)]
pub struct WizardState {
    pub user_id: String,
    /// Correlation id for the IdP login attempt, when the IdP sent one.
    pub idp_session: Option<String>,
    pub current: Option<CurrentAction>,
}

impl WizardState {
    pub fn new(user_id: impl Into<String>, idp_session: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            idp_session,
            current: None,
        }
    }
}

/// Storage contract for wizard state, keyed by browser session id.
///
/// The core depends only on this; the backing store is whatever the
/// deployment provides. One browser session has at most one in-flight
/// request, so no locking beyond the store's own is required.
pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> Option<WizardState>;
    fn save(&self, session_id: &str, state: WizardState);
    fn remove(&self, session_id: &str);
}

/// In-process session store backed by a `HashMap`.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<HashMap<String, WizardState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, session_id: &str) -> Option<WizardState> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .get(session_id)
            .cloned()
    }

    fn save(&self, session_id: &str, state: WizardState) {
        self.inner
            .write()
            .expect("session lock poisoned")
            .insert(session_id.to_string(), state);
    }

    fn remove(&self, session_id: &str) {
        self.inner
            .write()
            .expect("session lock poisoned")
            .remove(session_id);
    }
}

/// Fresh random browser-session id: 128 bits, lowercase hex.
pub fn new_session_id() -> String {
    let id: u128 = rand::thread_rng().gen();
    format!("{id:032x}")
}
