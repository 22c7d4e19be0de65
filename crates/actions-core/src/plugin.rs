//! The per-action-type plugin capability and its registry.
//!
//! Every action type (terms-of-use acceptance, second-factor setup, ...)
//! ships as an [`ActionPlugin`] implementation. The sequencer drives a
//! plugin through its declared number of steps and interprets the
//! outcome of each call as a tagged result — success, terminal failure,
//! or invalid input — so every branch is explicit at the call site.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::action::Action;

/// Form field carrying an explicit submission.
pub const SUBMIT_FIELD: &str = "submit";
/// Form field carrying an explicit rejection of the action.
pub const REJECT_FIELD: &str = "reject";

/// Field name → message, produced when submitted input fails validation.
pub type FieldErrors = BTreeMap<String, String>;

/// Terminal, user-visible failure of an action.
///
/// The message is shown to the user and must never carry sensitive
/// data. `remove_action` tells the sequencer to also delete the action
/// record because a retry is pointless, e.g. the record itself is
/// misconfigured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub message: String,
    pub remove_action: bool,
}

impl ActionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            remove_action: false,
        }
    }

    /// A failure that also deletes the action record.
    pub fn remove(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            remove_action: true,
        }
    }
}

/// Outcome signal from a plugin call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// The action failed terminally; show the message inline.
    #[error("{}", .0.message)]
    Failed(ActionFailure),
    /// The submitted input is merely invalid; re-render the same step
    /// with the field errors attached.
    #[error("invalid input")]
    Invalid(FieldErrors),
}

impl From<ActionFailure> for PluginError {
    fn from(failure: ActionFailure) -> Self {
        PluginError::Failed(failure)
    }
}

/// Form fields submitted for the current wizard step.
#[derive(Debug, Clone, Default)]
pub struct StepInput {
    fields: HashMap<String, String>,
}

impl StepInput {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A field counts as set when present and non-empty, which is how
    /// browsers submit named `<input type="submit">` controls.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }
}

/// One pluggable action type.
///
/// Side effects are confined to `perform`; a plugin never deletes its
/// own action record — only the sequencer does, and only after
/// `perform` returns `Ok`.
pub trait ActionPlugin: Send + Sync {
    /// How many forms the user steps through for this action type.
    /// Fixed per plugin.
    fn number_of_steps(&self) -> u32;

    /// Render the form body for `step` (1-based). `errors` carries
    /// field-level validation errors from a rejected submission of the
    /// same step, empty otherwise.
    fn step_body(
        &self,
        step: u32,
        action: &Action,
        input: &StepInput,
        errors: &FieldErrors,
    ) -> Result<String, PluginError>;

    /// Complete the action once the final step's input was collected.
    fn perform(&self, action: &Action, input: &StepInput) -> Result<(), PluginError>;
}

type PluginFactory = Box<dyn Fn() -> Arc<dyn ActionPlugin> + Send + Sync>;

/// Mapping from action-type string to plugin factory.
///
/// Built once at process start from the plugin crates linked into the
/// deployment, then passed into the sequencer and never mutated. A
/// lookup for an unregistered type at request time is a server fault:
/// it means pending data references a plugin that was never deployed.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin factory under an action-type name. The first
    /// registration wins; duplicates are logged and ignored.
    pub fn register<F, P>(&mut self, action_type: impl Into<String>, factory: F)
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: ActionPlugin + 'static,
    {
        let action_type = action_type.into();
        if self.factories.contains_key(&action_type) {
            tracing::warn!(%action_type, "duplicate plugin registration ignored");
            return;
        }
        tracing::debug!(%action_type, "registering action plugin");
        self.factories
            .insert(action_type, Box::new(move || Arc::new(factory())));
    }

    /// Instantiate a fresh plugin for the given action type.
    pub fn instantiate(&self, action_type: &str) -> Option<Arc<dyn ActionPlugin>> {
        self.factories.get(action_type).map(|f| f())
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.factories.contains_key(action_type)
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }
}
