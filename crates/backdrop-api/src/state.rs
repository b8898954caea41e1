//! Application state.

use std::sync::Arc;

use backdrop_ml_client::{BackgroundRemover, GeminiImageClient, RembgClient, StyleTransfer};

use crate::config::ApiConfig;
use crate::services::PipelineService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<PipelineService>,
    pub remover: Arc<dyn BackgroundRemover>,
    pub stylist: Arc<dyn StyleTransfer>,
}

impl AppState {
    /// Create new application state with HTTP-backed adapters.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let remover = RembgClient::new(config.rembg.clone())?;
        let stylist = GeminiImageClient::new(config.gemini.clone())?;

        Ok(Self::with_adapters(config, Arc::new(remover), Arc::new(stylist)))
    }

    /// Create state around explicit adapters.
    pub fn with_adapters(
        config: ApiConfig,
        remover: Arc<dyn BackgroundRemover>,
        stylist: Arc<dyn StyleTransfer>,
    ) -> Self {
        let pipeline = Arc::new(PipelineService::new(&config));
        Self {
            config,
            pipeline,
            remover,
            stylist,
        }
    }
}
