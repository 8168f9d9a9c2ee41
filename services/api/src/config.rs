//! HTTP server settings

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Server settings, read from `APP_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory uploaded images are written to
    pub upload_dir: String,
    /// Prefix of the public URLs handed out for uploads
    pub public_base_url: String,
}

impl ServerConfig {
    /// Load from `APP_HOST`, `APP_PORT`, `APP_UPLOAD_DIR` and
    /// `APP_PUBLIC_BASE_URL`, falling back to local defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("upload_dir", "uploads")?
            .set_default("public_base_url", "http://localhost:3000")?
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
