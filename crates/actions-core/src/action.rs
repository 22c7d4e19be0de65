//! Pending-action records.
//!
//! An `Action` is one task a user must complete before their login at the
//! IdP is allowed to finish (accept updated terms of use, register a
//! second factor, ...). Records are produced by external account-management
//! systems; this service only selects, drives, and deletes them. A record
//! exists exactly as long as it is pending: it is deleted once, either on
//! successful completion or on a terminal failure the plugin marks as
//! removable.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub user_id: String,
    /// Key into the plugin registry.
    pub action_type: String,
    /// Higher value = more urgent; the eligible action with the maximum
    /// preference is handled first.
    pub preference: i64,
    /// When set, the action applies to one specific IdP login attempt;
    /// when `None` it applies to the user globally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Plugin-specific parameters, opaque to the sequencer.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl Action {
    pub fn new(
        user_id: impl Into<String>,
        action_type: impl Into<String>,
        preference: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            action_type: action_type.into(),
            preference,
            session: None,
            params: serde_json::Map::new(),
        }
    }

    /// Builder: scope the action to one IdP login attempt.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Builder: set a plugin-specific parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Scope filter: a wizard bound to an IdP session sees global actions
    /// plus actions scoped to that same session; a wizard with no IdP
    /// session sees only global actions.
    pub fn eligible_for(&self, idp_session: Option<&str>) -> bool {
        match (self.session.as_deref(), idp_session) {
            (None, _) => true,
            (Some(own), Some(wizard)) => own == wizard,
            (Some(_), None) => false,
        }
    }

    /// Boolean plugin parameter; absent or non-boolean reads as `false`.
    pub fn param_flag(&self, key: &str) -> bool {
        self.params
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// String plugin parameter, if present.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }
}
