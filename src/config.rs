//! # Configuration Management
//!
//! Loads the settings for the upload server from several sources:
//! - Built-in defaults (the `Default` impl below)
//! - An optional `config.toml` next to the binary
//! - `APP__SECTION__KEY` environment variables
//! - The plain deployment variables the service has always honoured
//!   (`HOST`, `PORT`, `DATABASE_URL`, `CLOUDINARY_NAME`,
//!   `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Deployment variables
//! 2. `APP__` prefixed environment variables
//! 3. `config.toml`
//! 4. Defaults
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: the whole tree derives `Serialize` + `Deserialize` so the
//!   defaults can be fed back into the `config` builder as a source
//! - **Nested structs**: one struct per concern keeps each section small

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Placeholder shown instead of secrets in API responses and logs.
pub const REDACTED: &str = "********";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
}

/// Where the HTTP server listens.
///
/// - `host = "127.0.0.1"`: local development only
/// - `host = "0.0.0.0"`: accept connections from anywhere
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Credentials and options for the hosted media service.
///
/// ## Fields:
/// - `cloud_name`, `api_key`, `api_secret`: account credentials
/// - `api_base`: REST endpoint root, overridable for testing against a mock
/// - `resource_type`: the host's asset class; audio is stored as `video`
/// - `folder`: optional folder for uploaded assets (empty means none)
/// - `timeout_secs`: whole-request timeout for one upload call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
    pub resource_type: String,
    pub folder: String,
    pub timeout_secs: u64,
}

/// Database connection settings for the audio reference log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://audio.db?mode=rwc`
    pub url: String,
    pub max_connections: u32,
}

/// How incoming multipart uploads are accepted and spooled to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory holding temporary copies until they are forwarded
    pub dir: String,
    /// Multipart field carrying the audio file
    pub field_name: String,
    pub max_file_size_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            media: MediaConfig {
                cloud_name: String::new(),
                api_key: String::new(),
                api_secret: String::new(),
                api_base: "https://api.cloudinary.com/v1_1".to_string(),
                resource_type: "video".to_string(),
                folder: String::new(),
                timeout_secs: 60,
            },
            database: DatabaseConfig {
                url: "sqlite://audio.db?mode=rwc".to_string(),
                max_connections: 5,
            },
            uploads: UploadConfig {
                dir: "uploads".to_string(),
                field_name: "audio".to_string(),
                max_file_size_bytes: 50 * 1024 * 1024, // 50 MiB
            },
        }
    }
}

impl MediaConfig {
    /// True when all three credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl UploadConfig {
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }
}

impl AppConfig {
    /// Load configuration from every source in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP__SERVER__PORT=8000`
    /// - `APP__UPLOADS__MAX_FILE_SIZE_BYTES=1048576`
    /// - `CLOUDINARY_NAME=demo` (same as `APP__MEDIA__CLOUD_NAME=demo`)
    ///
    /// The double underscore separator keeps keys such as `max_file_size_bytes`
    /// intact; a single `_` would split them into nested tables.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            );

        // Plain variables used by hosting platforms and by earlier deployments
        let overrides = [
            ("HOST", "server.host"),
            ("PORT", "server.port"),
            ("DATABASE_URL", "database.url"),
            ("CLOUDINARY_NAME", "media.cloud_name"),
            ("CLOUDINARY_API_KEY", "media.api_key"),
            ("CLOUDINARY_API_SECRET", "media.api_secret"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = env::var(var) {
                settings = settings.set_override(key, value)?;
            }
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Missing media credentials are not checked here. Health reports them
    /// and uploads fail with `MediaError::NotConfigured`.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.uploads.dir.trim().is_empty() {
            return Err(anyhow::anyhow!("Upload directory cannot be empty"));
        }

        if self.uploads.field_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Upload field name cannot be empty"));
        }

        if self.uploads.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.media.resource_type.trim().is_empty() {
            return Err(anyhow::anyhow!("Media resource type cannot be empty"));
        }

        if self.media.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Media upload timeout must be greater than 0"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("Database max connections must be greater than 0"));
        }

        Ok(())
    }

    /// Apply a partial JSON update (used by `PUT /api/v1/config`).
    ///
    /// Only settings that are safe to change while running are accepted:
    /// the `uploads` limits and the media `folder`. Everything else (bind
    /// address, credentials, database) needs a restart and is ignored.
    ///
    /// Example body: `{"uploads": {"max_file_size_bytes": 1048576}}`
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(uploads) = partial_config.get("uploads") {
            if let Some(size) = uploads.get("max_file_size_bytes").and_then(|v| v.as_u64()) {
                self.uploads.max_file_size_bytes = size;
            }
            if let Some(field) = uploads.get("field_name").and_then(|v| v.as_str()) {
                self.uploads.field_name = field.to_string();
            }
        }

        if let Some(media) = partial_config.get("media") {
            if let Some(folder) = media.get("folder").and_then(|v| v.as_str()) {
                self.media.folder = folder.to_string();
            }
        }

        self.validate()?;
        Ok(())
    }

    /// JSON view of the configuration with credentials masked.
    pub fn redacted_json(&self) -> serde_json::Value {
        let mask = |s: &str| if s.is_empty() { "" } else { REDACTED };

        serde_json::json!({
            "server": {
                "host": self.server.host,
                "port": self.server.port
            },
            "media": {
                "cloud_name": self.media.cloud_name,
                "api_key": mask(&self.media.api_key),
                "api_secret": mask(&self.media.api_secret),
                "api_base": self.media.api_base,
                "resource_type": self.media.resource_type,
                "folder": self.media.folder,
                "timeout_secs": self.media.timeout_secs,
                "configured": self.media.is_configured()
            },
            "database": {
                "url": self.database.url,
                "max_connections": self.database.max_connections
            },
            "uploads": {
                "dir": self.uploads.dir,
                "field_name": self.uploads.field_name,
                "max_file_size_bytes": self.uploads.max_file_size_bytes
            }
        })
    }
}
