use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::pages;

/// Unified error type for HTTP responses.
///
/// Every core error that reaches the HTTP boundary is an integrity
/// fault (unregistered plugin type, store failure, plugin that cannot
/// render) and maps to a 500: retrying automatically or masking it
/// risks leaving the user stuck in an inconsistent wizard state. The
/// detail is logged server-side and never echoed to the client.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        pages::error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An internal error has occurred, please try again later",
        )
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
