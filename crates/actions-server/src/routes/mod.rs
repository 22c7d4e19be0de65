pub mod entry;
pub mod wizard;

use axum::http::{header, HeaderMap};

/// Cookie binding a browser to its wizard session.
pub const SESSION_COOKIE: &str = "actions_session";

/// Extract the wizard session id from the request's Cookie header.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let prefix = format!("{SESSION_COOKIE}=");
    for part in cookies.split(';') {
        if let Some(val) = part.trim().strip_prefix(&prefix) {
            if !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}
