//! Server configuration from the environment

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use clinic_desk_domain::services::UploadSettings;

/// Settings the API layer needs at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port (`PORT`, default 3000)
    pub port: u16,
    /// Where and how uploads are stored
    pub uploads: UploadSettings,
    /// Single allowed CORS origin; any origin when unset
    pub cors_allow_origin: Option<String>,
    /// Bootstrap admin, created when no admin exists yet
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            uploads: UploadSettings::default(),
            cors_allow_origin: None,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let uploads = UploadSettings {
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads.upload_dir),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.uploads.max_upload_bytes),
            image_max_dimension: env_or("IMAGE_MAX_DIMENSION", defaults.uploads.image_max_dimension),
            jpeg_quality: env_or("IMAGE_JPEG_QUALITY", defaults.uploads.jpeg_quality).clamp(1, 100),
        };

        let config = Self {
            port: env_or("PORT", defaults.port),
            uploads,
            cors_allow_origin: non_empty("CORS_ALLOW_ORIGIN"),
            admin_username: non_empty("ADMIN_USERNAME"),
            admin_password: non_empty("ADMIN_PASSWORD"),
        };

        info!(
            "Server configuration: port={}, upload_dir={}, max_upload_bytes={}",
            config.port,
            config.uploads.upload_dir.display(),
            config.uploads.max_upload_bytes
        );
        config
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_or<T: FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
