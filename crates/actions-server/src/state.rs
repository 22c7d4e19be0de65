use std::sync::Arc;

use actions_core::plugin::PluginRegistry;
use actions_core::session::SessionStore;
use actions_core::store::ActionStore;
use actions_core::wizard::Sequencer;

/// Configuration the gateway needs from its deployment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Shared secret also configured in the IdP; authenticates the
    /// inbound redirect.
    pub shared_secret: String,
    /// Where the browser is sent once no pending actions remain.
    pub idp_url: String,
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ActionStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub sequencer: Arc<Sequencer>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<ActionStore>,
        registry: Arc<PluginRegistry>,
        sessions: Arc<dyn SessionStore>,
        config: GatewayConfig,
    ) -> Self {
        let sequencer = Arc::new(Sequencer::new(
            store.clone(),
            registry,
            config.idp_url.clone(),
        ));
        Self {
            store,
            sessions,
            sequencer,
            config: Arc::new(config),
        }
    }
}
