use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use actions_core::plugin::PluginRegistry;
use actions_core::session::MemorySessionStore;
use actions_core::store::ActionStore;
use actions_server::state::{AppState, GatewayConfig};

#[derive(Parser)]
#[command(
    name = "actions-gw",
    about = "Login-interruption gateway — walks users through pending actions before their IdP login completes",
    version
)]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 6543, env = "ACTIONS_PORT")]
    port: u16,

    /// Path to the pending-action database
    #[arg(long, default_value = "actions.redb", env = "ACTIONS_DB")]
    db: PathBuf,

    /// IdP return URL users are sent back to once done
    #[arg(long, env = "ACTIONS_IDP_URL")]
    idp_url: String,

    /// Shared secret also configured in the IdP
    #[arg(long, env = "ACTIONS_SHARED_SECRET", hide_env_values = true)]
    shared_secret: String,
}

/// The deployment's plugin set. Action plugins are separate crates
/// linked into this binary and registered here at startup; a pending
/// record whose type is missing from this registry faults with a 500
/// at request time.
fn build_registry() -> PluginRegistry {
    PluginRegistry::new()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = Arc::new(ActionStore::open(&cli.db)?);
    let registry = build_registry();
    if registry.is_empty() {
        tracing::warn!("no action plugins registered; any pending action will fault");
    }

    let state = AppState::new(
        store,
        Arc::new(registry),
        Arc::new(MemorySessionStore::new()),
        GatewayConfig {
            shared_secret: cli.shared_secret,
            idp_url: cli.idp_url,
        },
    );

    actions_server::serve(state, cli.port).await
}
