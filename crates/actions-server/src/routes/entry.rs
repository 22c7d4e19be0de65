//! Authenticated entry point for the IdP redirect.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Deserialize;

use actions_core::auth::verify_auth_token;
use actions_core::session::{new_session_id, WizardState};

use crate::pages;
use crate::routes::SESSION_COOKIE;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EntryParams {
    pub userid: Option<String>,
    pub token: Option<String>,
    pub nonce: Option<String>,
    pub ts: Option<String>,
    /// IdP login-attempt correlation id; absent for global interruptions.
    pub session: Option<String>,
}

/// GET / — validate the inbound token, bind the user to a fresh wizard
/// session, and send the browser to the wizard endpoint.
///
/// The 400 messages are deliberately generic; which verification check
/// failed is only ever logged server-side.
pub async fn entry(State(app): State<AppState>, Query(params): Query<EntryParams>) -> Response {
    let (Some(userid), Some(token), Some(nonce), Some(ts)) =
        (params.userid, params.token, params.nonce, params.ts)
    else {
        return pages::error_page(
            StatusCode::BAD_REQUEST,
            "Insufficient authentication params",
        );
    };

    if !verify_auth_token(&app.config.shared_secret, &userid, &token, &nonce, &ts) {
        tracing::info!(%userid, "token authentication failed");
        return pages::error_page(
            StatusCode::BAD_REQUEST,
            "Token authentication has failed, you do not seem to come from a listed IdP",
        );
    }

    tracing::info!(%userid, "starting pre-login actions");
    let session_id = new_session_id();
    app.sessions
        .save(&session_id, WizardState::new(userid, params.session));

    let cookie = format!("{SESSION_COOKIE}={session_id}; HttpOnly; SameSite=Lax; Path=/");
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, "/perform-action")
        .header(header::SET_COOKIE, cookie)
        .body(Body::empty())
        .expect("infallible: all header values are valid ASCII")
}
