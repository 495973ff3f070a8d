use crate::config::ServerConfig;
use crate::pipeline::gateway::ModelGateway;
use crate::pipeline::render::RenderSettings;
use crate::pipeline::upload::UploadStore;
use std::sync::Arc;

/// Shared, read-only state for the backend handlers.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub uploads: UploadStore,
    pub render: RenderSettings,
    pub gateway: Arc<ModelGateway>,
}

impl AppState {
    pub fn new(config: ServerConfig, gateway: ModelGateway) -> Self {
        Self {
            uploads: UploadStore::from_config(&config),
            render: RenderSettings::from_config(&config),
            gateway: Arc::new(gateway),
            config: Arc::new(config),
        }
    }

    pub fn ai_configured(&self) -> bool {
        self.gateway.is_configured()
    }
}
