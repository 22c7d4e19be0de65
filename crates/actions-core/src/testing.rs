//! Dummy action plugins for exercising the sequencer and the HTTP
//! surface without real plugin crates.

use crate::action::Action;
use crate::plugin::{
    ActionFailure, ActionPlugin, FieldErrors, PluginError, StepInput, REJECT_FIELD,
};

/// Scriptable dummy plugin driven by the action's params:
///
/// - `body_failure`: every `step_body` call fails with "Body failure";
/// - `perform_failure`: `perform` fails with "Perform failure";
/// - `remove_on_failure`: a terminal failure also deletes the record;
/// - `require_field`: `perform` reports a validation error unless the
///   named form field was submitted non-empty.
///
/// Independently of params, a submitted `reject` control field makes
/// `perform` fail with "Action not performed".
pub struct DummyActionPlugin {
    steps: u32,
}

impl DummyActionPlugin {
    pub fn one_step() -> Self {
        Self { steps: 1 }
    }

    pub fn two_steps() -> Self {
        Self { steps: 2 }
    }

    fn failure(&self, action: &Action, message: &str) -> PluginError {
        if action.param_flag("remove_on_failure") {
            ActionFailure::remove(message).into()
        } else {
            ActionFailure::new(message).into()
        }
    }
}

impl ActionPlugin for DummyActionPlugin {
    fn number_of_steps(&self) -> u32 {
        self.steps
    }

    fn step_body(
        &self,
        step: u32,
        action: &Action,
        _input: &StepInput,
        errors: &FieldErrors,
    ) -> Result<String, PluginError> {
        if action.param_flag("body_failure") {
            return Err(self.failure(action, "Body failure"));
        }
        let mut html = format!("<h1>Dummy action (step {step} of {})</h1>", self.steps);
        for (field, message) in errors {
            html.push_str(&format!("<p class=\"field-error\">{field}: {message}</p>"));
        }
        html.push_str(concat!(
            "<form id=\"dummy\" method=\"POST\" action=\"/perform-action\">",
            "<input type=\"submit\" name=\"submit\" value=\"submit\">",
            "<input type=\"submit\" name=\"reject\" value=\"reject\">",
            "</form>",
        ));
        Ok(html)
    }

    fn perform(&self, action: &Action, input: &StepInput) -> Result<(), PluginError> {
        if action.param_flag("perform_failure") {
            return Err(self.failure(action, "Perform failure"));
        }
        if input.is_set(REJECT_FIELD) {
            return Err(ActionFailure::new("Action not performed").into());
        }
        if let Some(field) = action.param_str("require_field") {
            if !input.is_set(field) {
                let mut errors = FieldErrors::new();
                errors.insert(field.to_string(), "this field is required".to_string());
                return Err(PluginError::Invalid(errors));
            }
        }
        Ok(())
    }
}
