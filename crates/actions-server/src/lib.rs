pub mod error;
pub mod pages;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the axum Router with the gateway routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::entry::entry))
        .route(
            "/perform-action",
            get(routes::wizard::show_step).post(routes::wizard::submit_step),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway on the given port.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("actions gateway listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
