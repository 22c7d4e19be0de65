use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionsError {
    /// A pending action references a plugin that was never registered.
    /// This is a deployment fault, not a user error.
    #[error("no plugin registered for action type: {0}")]
    UnregisteredPlugin(String),

    #[error("action store error: {0}")]
    Store(String),

    #[error("plugin could not render step {step}: {message}")]
    StepRender { step: u32, message: String },
}

pub type Result<T> = std::result::Result<T, ActionsError>;
