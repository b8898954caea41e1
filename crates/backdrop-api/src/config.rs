//! API configuration.

use std::path::PathBuf;

use backdrop_media::logo::{DEFAULT_BOTTOM_LEFT_LOGO, DEFAULT_TOP_RIGHT_LOGO};
use backdrop_media::output::DEFAULT_OUTPUT_DIR;
use backdrop_media::LogoConfig;
use backdrop_ml_client::{GeminiConfig, RembgConfig};

/// Background pasted behind the cutout.
pub const DEFAULT_BACKGROUND_PATH: &str = "static/images/forest.jpg";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Where rendered videos are written
    pub output_dir: PathBuf,
    /// Replacement background image
    pub background_path: PathBuf,
    /// Logo pasted bottom-left on styled images
    pub logo_bottom_left: PathBuf,
    /// Logo pasted top-right on styled images
    pub logo_top_right: PathBuf,
    /// Background-removal service
    pub rembg: RembgConfig,
    /// Generative image service
    pub gemini: GeminiConfig,
    /// Expose Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 25 * 1024 * 1024, // 25MB
            environment: "development".to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            background_path: PathBuf::from(DEFAULT_BACKGROUND_PATH),
            logo_bottom_left: PathBuf::from(DEFAULT_BOTTOM_LEFT_LOGO),
            logo_top_right: PathBuf::from(DEFAULT_TOP_RIGHT_LOGO),
            rembg: RembgConfig::default(),
            gemini: GeminiConfig::default(),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(25 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            output_dir: env_path("OUTPUT_DIR", DEFAULT_OUTPUT_DIR),
            background_path: env_path("BACKGROUND_IMAGE_PATH", DEFAULT_BACKGROUND_PATH),
            logo_bottom_left: env_path("LOGO_BOTTOM_LEFT_PATH", DEFAULT_BOTTOM_LEFT_LOGO),
            logo_top_right: env_path("LOGO_TOP_RIGHT_PATH", DEFAULT_TOP_RIGHT_LOGO),
            rembg: RembgConfig::from_env(),
            gemini: GeminiConfig::from_env(),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Logo placement for styled images.
    pub fn logo_config(&self) -> LogoConfig {
        LogoConfig::default()
            .with_bottom_left(&self.logo_bottom_left)
            .with_top_right(&self.logo_top_right)
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_bundled_assets() {
        let config = ApiConfig::default();
        assert_eq!(config.background_path, PathBuf::from("static/images/forest.jpg"));
        assert_eq!(config.output_dir, PathBuf::from("media/videos"));
        assert_eq!(config.max_body_size, 25 * 1024 * 1024);
        assert!(config.gemini.api_key.is_none());
        assert!(!config.is_production());

        let logos = config.logo_config();
        assert_eq!(logos.bottom_left, PathBuf::from("media/images/lgo2titan.png"));
        assert_eq!(logos.top_right, PathBuf::from("media/images/lgo1titan.png"));
    }
}
