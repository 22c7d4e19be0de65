//! Minimal HTML shell around plugin-rendered step bodies.
//!
//! Step bodies come from plugins and are trusted markup; everything
//! else that ends up in a page (failure messages, error text) is
//! escaped first.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Wrap a body fragment in the page shell.
pub fn page(body: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\">",
            "<title>Pending actions</title></head>",
            "<body>{}</body></html>",
        ),
        body
    )
}

/// Inline block for a terminal plugin failure.
pub fn failure_block(message: &str) -> String {
    format!(
        "<div class=\"action-failure\"><h2>{}</h2></div>",
        escape(message)
    )
}

/// A full error response: status code plus an HTML page carrying the
/// (escaped) message.
pub fn error_page(status: StatusCode, message: &str) -> Response {
    let body = format!("<h1>{}</h1><p>{}</p>", status.as_u16(), escape(message));
    (status, Html(page(&body))).into_response()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
