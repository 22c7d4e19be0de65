//! The wizard endpoints: render the current step and accept step
//! submissions. All state-machine decisions live in
//! `actions_core::wizard::Sequencer`; these handlers only bind it to
//! the session cookie and translate outcomes into HTTP responses.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;

use actions_core::plugin::StepInput;
use actions_core::session::WizardState;
use actions_core::wizard::WizardOutcome;
use actions_core::ActionsError;

use crate::error::AppError;
use crate::pages;
use crate::routes::session_id_from_headers;
use crate::state::AppState;

/// GET /perform-action — select the most important pending action and
/// render its current step, or return to the IdP when none remain.
pub async fn show_step(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some((session_id, state)) = load_session(&app, &headers) else {
        tracing::info!("unidentified user");
        return Ok(pages::error_page(StatusCode::FORBIDDEN, "Forbidden"));
    };

    let outcome = run_sequencer(&app, &session_id, state, StepInput::default(), false).await?;
    Ok(respond(outcome))
}

/// POST /perform-action — submit the current step's form data.
pub async fn submit_step(
    State(app): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let Some((session_id, state)) = load_session(&app, &headers) else {
        tracing::info!("unidentified user");
        return Ok(pages::error_page(StatusCode::FORBIDDEN, "Forbidden"));
    };

    let outcome = run_sequencer(&app, &session_id, state, StepInput::new(fields), true).await?;
    Ok(respond(outcome))
}

/// Drive one sequencer transition on the blocking pool (the store is a
/// synchronous embedded database) and persist the updated wizard state.
async fn run_sequencer(
    app: &AppState,
    session_id: &str,
    mut state: WizardState,
    input: StepInput,
    is_submit: bool,
) -> Result<WizardOutcome, AppError> {
    let sequencer = app.sequencer.clone();
    let (outcome, state) = tokio::task::spawn_blocking(move || {
        let outcome = if is_submit {
            sequencer.submit(&mut state, &input)?
        } else {
            sequencer.begin(&mut state, &input)?
        };
        Ok::<_, ActionsError>((outcome, state))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    app.sessions.save(session_id, state);
    Ok(outcome)
}

fn load_session(app: &AppState, headers: &HeaderMap) -> Option<(String, WizardState)> {
    let session_id = session_id_from_headers(headers)?;
    let state = app.sessions.load(&session_id)?;
    Some((session_id, state))
}

fn respond(outcome: WizardOutcome) -> Response {
    match outcome {
        WizardOutcome::RedirectToIdp(url) => redirect(&url),
        WizardOutcome::Continue => redirect("/perform-action"),
        WizardOutcome::Step(html) => Html(pages::page(&html)).into_response(),
        WizardOutcome::Failure(message) => {
            Html(pages::page(&pages::failure_block(&message))).into_response()
        }
    }
}

fn redirect(location: &str) -> Response {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .expect("infallible: all header values are valid ASCII")
}
