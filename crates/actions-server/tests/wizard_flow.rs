//! End-to-end tests of the gateway HTTP surface: IdP entry, the step
//! wizard, and the terminal redirect back to the IdP.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use actions_core::action::Action;
use actions_core::auth::compute_auth_token;
use actions_core::plugin::PluginRegistry;
use actions_core::session::MemorySessionStore;
use actions_core::store::ActionStore;
use actions_core::testing::DummyActionPlugin;
use actions_server::state::{AppState, GatewayConfig};

const SHARED_SECRET: &str = "123123";
const IDP_URL: &str = "http://example.com/idp";
const USER: &str = "123467890123456789014567";
const NONCE: &str = "0123456789abcdef";

struct TestGateway {
    app: Router,
    store: Arc<ActionStore>,
    _dir: TempDir,
}

fn gateway() -> TestGateway {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ActionStore::open(&dir.path().join("actions.redb")).unwrap());

    let mut registry = PluginRegistry::new();
    registry.register("dummy", DummyActionPlugin::one_step);
    registry.register("dummy2", DummyActionPlugin::one_step);
    registry.register("dummy_2steps", DummyActionPlugin::two_steps);

    let state = AppState::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(MemorySessionStore::new()),
        GatewayConfig {
            shared_secret: SHARED_SECRET.to_string(),
            idp_url: IDP_URL.to_string(),
        },
    );
    TestGateway {
        app: actions_server::build_router(state),
        store,
        _dir: dir,
    }
}

/// Entry URL with a token minted the way the IdP mints them.
fn entry_url(idp_session: Option<&str>) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let ts_hex = format!("{now:x}");
    let token = compute_auth_token(SHARED_SECRET, USER, NONCE, &ts_hex);
    let mut url = format!("/?userid={USER}&token={token}&nonce={NONCE}&ts={ts_hex}");
    if let Some(session) = idp_session {
        url.push_str(&format!("&session={session}"));
    }
    url
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(app: &Router, uri: &str, cookie: &str, form: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("cookie", cookie)
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn session_cookie(response: &axum::response::Response) -> String {
    let raw = response
        .headers()
        .get("set-cookie")
        .expect("entry should set the session cookie")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get("location")
        .expect("expected a redirect")
        .to_str()
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Authenticate and return the session cookie, following the entry
/// redirect to /perform-action.
async fn authenticate(app: &Router, idp_session: Option<&str>) -> String {
    let response = get(app, &entry_url(idp_session), None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/perform-action");
    session_cookie(&response)
}

#[tokio::test]
async fn missing_auth_params_is_a_400() {
    let gw = gateway();
    let response = get(&gw.app, "/?userid=user1&token=abc&nonce=sdf", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("Insufficient authentication params"));
}

#[tokio::test]
async fn bad_token_is_a_400() {
    let gw = gateway();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let url = format!("/?userid={USER}&token=not-a-token&nonce={NONCE}&ts={now:x}");
    let response = get(&gw.app, &url, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("Token authentication has failed"));
}

#[tokio::test]
async fn wizard_without_session_is_forbidden() {
    let gw = gateway();
    let response = get(&gw.app, "/perform-action", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_form(&gw.app, "/perform-action", "other=1", "submit=submit").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unsupported_method_is_rejected_by_routing() {
    let gw = gateway();
    let response = gw
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/perform-action")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn no_pending_actions_redirects_to_idp() {
    let gw = gateway();
    let cookie = authenticate(&gw.app, None).await;

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), IDP_URL);
    assert_eq!(gw.store.count().unwrap(), 0);
}

#[tokio::test]
async fn one_step_action_full_flow() {
    let gw = gateway();
    gw.store.insert(&Action::new(USER, "dummy", 100)).unwrap();
    let cookie = authenticate(&gw.app, None).await;

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Dummy action"));
    assert!(body.contains("id=\"dummy\""));
    assert_eq!(gw.store.count().unwrap(), 1);

    let response = post_form(&gw.app, "/perform-action", &cookie, "submit=submit").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/perform-action");
    assert_eq!(gw.store.count().unwrap(), 0);

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), IDP_URL);
}

#[tokio::test]
async fn two_step_action_advances_then_completes() {
    let gw = gateway();
    gw.store
        .insert(&Action::new(USER, "dummy_2steps", 100))
        .unwrap();
    let cookie = authenticate(&gw.app, None).await;

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_form(&gw.app, "/perform-action", &cookie, "submit=submit").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("step 2 of 2"));
    assert_eq!(gw.store.count().unwrap(), 1);

    let response = post_form(&gw.app, "/perform-action", &cookie, "submit=submit").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(gw.store.count().unwrap(), 0);
}

#[tokio::test]
async fn two_actions_run_highest_preference_first() {
    let gw = gateway();
    gw.store.insert(&Action::new(USER, "dummy", 100)).unwrap();
    gw.store.insert(&Action::new(USER, "dummy2", 200)).unwrap();
    let cookie = authenticate(&gw.app, None).await;

    get(&gw.app, "/perform-action", Some(&cookie)).await;
    post_form(&gw.app, "/perform-action", &cookie, "submit=submit").await;
    assert_eq!(gw.store.count().unwrap(), 1);
    let remaining = gw.store.next_pending(USER, None).unwrap().unwrap();
    assert_eq!(remaining.action_type, "dummy");

    get(&gw.app, "/perform-action", Some(&cookie)).await;
    post_form(&gw.app, "/perform-action", &cookie, "submit=submit").await;
    assert_eq!(gw.store.count().unwrap(), 0);
}

#[tokio::test]
async fn session_scoped_action_is_skipped_for_other_login() {
    let gw = gateway();
    gw.store
        .insert(&Action::new(USER, "dummy", 100).with_session("abcd"))
        .unwrap();
    let cookie = authenticate(&gw.app, Some("xyzw")).await;

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("{IDP_URL}?key=xyzw"));
    assert_eq!(gw.store.count().unwrap(), 1);
}

#[tokio::test]
async fn session_scoped_action_runs_for_matching_login() {
    let gw = gateway();
    gw.store
        .insert(&Action::new(USER, "dummy", 100).with_session("abcd"))
        .unwrap();
    let cookie = authenticate(&gw.app, Some("abcd")).await;

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    post_form(&gw.app, "/perform-action", &cookie, "submit=submit").await;
    assert_eq!(gw.store.count().unwrap(), 0);

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(location(&response), format!("{IDP_URL}?key=abcd"));
}

#[tokio::test]
async fn perform_failure_is_shown_inline_and_keeps_the_record() {
    let gw = gateway();
    gw.store
        .insert(
            &Action::new(USER, "dummy", 100).with_param("perform_failure", serde_json::json!(true)),
        )
        .unwrap();
    let cookie = authenticate(&gw.app, None).await;

    get(&gw.app, "/perform-action", Some(&cookie)).await;
    let response = post_form(&gw.app, "/perform-action", &cookie, "submit=submit").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Perform failure"));
    assert_eq!(gw.store.count().unwrap(), 1);
}

#[tokio::test]
async fn rejecting_an_action_keeps_the_record() {
    let gw = gateway();
    gw.store.insert(&Action::new(USER, "dummy", 100)).unwrap();
    let cookie = authenticate(&gw.app, None).await;

    get(&gw.app, "/perform-action", Some(&cookie)).await;
    let response = post_form(&gw.app, "/perform-action", &cookie, "reject=reject").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Action not performed"));
    assert_eq!(gw.store.count().unwrap(), 1);
}

#[tokio::test]
async fn body_failure_is_shown_without_a_form() {
    let gw = gateway();
    gw.store
        .insert(&Action::new(USER, "dummy", 100).with_param("body_failure", serde_json::json!(true)))
        .unwrap();
    let cookie = authenticate(&gw.app, None).await;

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Body failure"));
    assert!(!body.contains("id=\"dummy\""));
    assert_eq!(gw.store.count().unwrap(), 1);
}

#[tokio::test]
async fn unregistered_action_type_is_a_server_fault() {
    let gw = gateway();
    gw.store.insert(&Action::new(USER, "tou", 100)).unwrap();
    let cookie = authenticate(&gw.app, None).await;

    let response = get(&gw.app, "/perform-action", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(gw.store.count().unwrap(), 1);
}

#[tokio::test]
async fn validation_error_re_renders_the_step_with_field_errors() {
    let gw = gateway();
    gw.store
        .insert(
            &Action::new(USER, "dummy", 100).with_param("require_field", serde_json::json!("accept")),
        )
        .unwrap();
    let cookie = authenticate(&gw.app, None).await;

    get(&gw.app, "/perform-action", Some(&cookie)).await;
    let response = post_form(&gw.app, "/perform-action", &cookie, "submit=submit").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("this field is required"));
    assert_eq!(gw.store.count().unwrap(), 1);

    let response = post_form(
        &gw.app,
        "/perform-action",
        &cookie,
        "submit=submit&accept=yes",
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(gw.store.count().unwrap(), 0);
}
