//! The pending-action sequencer.
//!
//! State machine that walks an authenticated user through every
//! eligible pending action, one multi-step form at a time, and hands
//! the browser back to the IdP once the pending set is empty.
//!
//! Exactly one action is in flight per browser session; the pending set
//! is re-read fresh after each completion, so an action inserted while
//! the wizard is running is still picked up before the user returns to
//! the IdP.

use std::sync::Arc;

use crate::error::{ActionsError, Result};
use crate::plugin::{ActionFailure, FieldErrors, PluginError, PluginRegistry, StepInput};
use crate::session::{CurrentAction, WizardState};
use crate::store::ActionStore;

/// What the HTTP layer should do after a sequencer transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    /// Nothing left for this user — send the browser back to the IdP,
    /// carrying the login-attempt correlation key when one is present.
    RedirectToIdp(String),
    /// Redirect back to the wizard endpoint to select the next action.
    Continue,
    /// Render this HTML as the current step's form.
    Step(String),
    /// The plugin reported a terminal failure; show the message inline.
    Failure(String),
}

pub struct Sequencer {
    store: Arc<ActionStore>,
    registry: Arc<PluginRegistry>,
    idp_url: String,
}

impl Sequencer {
    pub fn new(
        store: Arc<ActionStore>,
        registry: Arc<PluginRegistry>,
        idp_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            idp_url: idp_url.into(),
        }
    }

    /// Entry transition for the wizard GET: re-read the pending set,
    /// select the most important eligible action, and render its first
    /// step.
    ///
    /// Returns `RedirectToIdp` when the pending set is empty — the
    /// terminal success path. An unregistered action type is a fatal
    /// deployment fault, not a user-facing error.
    pub fn begin(&self, state: &mut WizardState, input: &StepInput) -> Result<WizardOutcome> {
        let action = match self
            .store
            .next_pending(&state.user_id, state.idp_session.as_deref())?
        {
            Some(action) => action,
            None => {
                tracing::info!(user_id = %state.user_id, "finished pre-login actions");
                state.current = None;
                return Ok(WizardOutcome::RedirectToIdp(self.idp_return_url(state)));
            }
        };

        let plugin = self
            .registry
            .instantiate(&action.action_type)
            .ok_or_else(|| ActionsError::UnregisteredPlugin(action.action_type.clone()))?;
        tracing::info!(
            user_id = %state.user_id,
            action_type = %action.action_type,
            "starting pre-login action"
        );

        let current = CurrentAction {
            step: 1,
            total_steps: plugin.number_of_steps(),
            plugin,
            action,
        };
        let outcome = self.render_step(&current, 1, input, &FieldErrors::new());
        state.current = Some(current);
        outcome
    }

    /// Submission transition for the wizard POST.
    ///
    /// At the final step, runs `perform` and interprets the outcome:
    /// success deletes the record exactly once and loops back to
    /// selection; a terminal failure is shown inline, the record kept
    /// unless the plugin marked it removable; invalid input re-renders
    /// the same step with field errors. Before the final step it simply
    /// advances and renders the next step's body.
    pub fn submit(&self, state: &mut WizardState, input: &StepInput) -> Result<WizardOutcome> {
        let user_id = state.user_id.clone();
        let Some(cur) = state.current.as_mut() else {
            // Stale or duplicated submission with no action in flight;
            // let the wizard GET re-select.
            return Ok(WizardOutcome::Continue);
        };

        let mut errors = FieldErrors::new();
        if cur.step == cur.total_steps {
            match cur.plugin.perform(&cur.action, input) {
                Ok(()) => {
                    self.store.remove(cur.action.id)?;
                    tracing::info!(
                        user_id = %user_id,
                        action_type = %cur.action.action_type,
                        "finished pre-login action"
                    );
                    return Ok(WizardOutcome::Continue);
                }
                Err(PluginError::Failed(failure)) => {
                    return Ok(WizardOutcome::Failure(self.abort(cur, failure)?));
                }
                Err(PluginError::Invalid(field_errors)) => {
                    tracing::info!(
                        step = cur.step,
                        action_type = %cur.action.action_type,
                        errors = ?field_errors,
                        "submitted input failed validation"
                    );
                    errors = field_errors;
                    // Net effect with the advance below: the user stays
                    // on the same step, re-rendered with field errors.
                    cur.step -= 1;
                }
            }
        }

        cur.step += 1;
        let step = cur.step;
        self.render_step(cur, step, input, &errors)
    }

    fn render_step(
        &self,
        cur: &CurrentAction,
        step: u32,
        input: &StepInput,
        errors: &FieldErrors,
    ) -> Result<WizardOutcome> {
        match cur.plugin.step_body(step, &cur.action, input, errors) {
            Ok(html) => Ok(WizardOutcome::Step(html)),
            Err(PluginError::Failed(failure)) => {
                Ok(WizardOutcome::Failure(self.abort(cur, failure)?))
            }
            // A body render may itself flag invalid input; re-render
            // once with the field errors attached.
            Err(PluginError::Invalid(field_errors)) => {
                match cur.plugin.step_body(step, &cur.action, input, &field_errors) {
                    Ok(html) => Ok(WizardOutcome::Step(html)),
                    Err(PluginError::Failed(failure)) => {
                        Ok(WizardOutcome::Failure(self.abort(cur, failure)?))
                    }
                    Err(PluginError::Invalid(_)) => Err(ActionsError::StepRender {
                        step,
                        message: "plugin rejected its own re-render".to_string(),
                    }),
                }
            }
        }
    }

    /// Log and apply a terminal plugin failure; returns the message to
    /// show inline. The record is deleted only when the plugin marked
    /// the failure as removable.
    fn abort(&self, cur: &CurrentAction, failure: ActionFailure) -> Result<String> {
        tracing::info!(
            action_type = %cur.action.action_type,
            reason = %failure.message,
            "aborted pre-login action"
        );
        if failure.remove_action {
            self.store.remove(cur.action.id)?;
        }
        Ok(failure.message)
    }

    fn idp_return_url(&self, state: &WizardState) -> String {
        match &state.idp_session {
            Some(key) => format!("{}?key={}", self.idp_url, key),
            None => self.idp_url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
