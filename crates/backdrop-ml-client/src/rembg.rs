//! Background removal over HTTP.
//!
//! Talks to a `rembg` server: the image goes up as the multipart field
//! `file` and the PNG cutout comes back as the response body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{MlError, MlResult};
use crate::traits::BackgroundRemover;

/// Default cutout server.
pub const DEFAULT_REMBG_URL: &str = "http://localhost:7000";

/// Configuration for the rembg client.
#[derive(Debug, Clone)]
pub struct RembgConfig {
    /// Base URL of the rembg server
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for RembgConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REMBG_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl RembgConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("REMBG_URL").unwrap_or_else(|_| DEFAULT_REMBG_URL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("REMBG_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}

/// Client for a rembg cutout server.
pub struct RembgClient {
    http: Client,
    config: RembgConfig,
}

impl RembgClient {
    pub fn new(config: RembgConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &RembgConfig {
        &self.config
    }

    fn remove_url(&self) -> String {
        format!("{}/api/remove", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl BackgroundRemover for RembgClient {
    async fn remove_background(&self, image: Vec<u8>) -> MlResult<Vec<u8>> {
        let url = self.remove_url();
        let input_len = image.len();
        debug!(url = %url, bytes = input_len, "Sending image to rembg");

        let part = Part::bytes(image)
            .file_name("upload")
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::status("rembg", status, &body));
        }

        let cutout = response.bytes().await?.to_vec();
        if cutout.is_empty() {
            return Err(MlError::InvalidResponse("rembg returned an empty body".to_string()));
        }

        info!(input_bytes = input_len, output_bytes = cutout.len(), "Background removed");
        Ok(cutout)
    }
}
