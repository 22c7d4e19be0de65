pub mod action;
pub mod auth;
pub mod error;
pub mod plugin;
pub mod session;
pub mod store;
pub mod testing;
pub mod wizard;

pub use error::{ActionsError, Result};
