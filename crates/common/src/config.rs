//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::AppError;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Token signing and identity providers.
    pub auth: AuthConfig,
    /// Image hosting.
    #[serde(default)]
    pub images: ImagesConfig,
    /// Push gateway.
    #[serde(default)]
    pub push: PushConfig,
    /// Mail relay. Password reset mails are only logged when absent.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this deployment.
    pub public_url: String,
    /// Maximum accepted request body, in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for bearer tokens.
    pub jwt_secret: String,
    /// Bearer token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
    /// Google OAuth client id expected as ID token audience.
    pub google_client_id: String,
    /// Google token verification endpoint.
    #[serde(default = "default_google_tokeninfo_url")]
    pub google_tokeninfo_url: String,
    /// Password reset token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub password_reset_ttl_secs: i64,
    /// Front-end page receiving `?token=` for password resets.
    pub password_reset_url: Option<String>,
}

/// Image host selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ImageHostConfig {
    /// Files written to disk and served from `base_url`.
    Local {
        /// Directory holding uploaded images.
        base_path: PathBuf,
        /// URL prefix the directory is served under.
        base_url: String,
    },
    /// Cloudinary upload API.
    Cloudinary {
        /// Cloud name.
        cloud_name: String,
        /// API key.
        api_key: String,
        /// API secret used for request signatures.
        api_secret: String,
    },
}

impl Default for ImageHostConfig {
    fn default() -> Self {
        Self::Local {
            base_path: PathBuf::from("./files"),
            base_url: "/files".to_string(),
        }
    }
}

/// Image configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Host backend.
    #[serde(default)]
    pub host: ImageHostConfig,
    /// Folder marker images are stored under.
    #[serde(default = "default_marker_folder")]
    pub marker_folder: String,
    /// Folder profile pictures are stored under.
    #[serde(default = "default_profile_folder")]
    pub profile_folder: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            host: ImageHostConfig::default(),
            marker_folder: default_marker_folder(),
            profile_folder: default_profile_folder(),
        }
    }
}

/// Push gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Endpoint push messages are posted to.
    #[serde(default = "default_push_gateway")]
    pub gateway_url: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_push_gateway(),
        }
    }
}

/// SMTP relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Relay host.
    pub smtp_host: String,
    /// Relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Relay username.
    pub username: Option<String>,
    /// Relay password.
    pub password: Option<String>,
    /// Sender address.
    pub from_address: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_body_limit() -> usize {
    50 * 1024 * 1024
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_token_ttl() -> i64 {
    3600
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Mappoint".to_string()
}

fn default_google_tokeninfo_url() -> String {
    "https://oauth2.googleapis.com/tokeninfo".to_string()
}

fn default_marker_folder() -> String {
    "mapPoint/markers".to_string()
}

fn default_profile_folder() -> String {
    "mapPoint/profile_pictures".to_string()
}

fn default_push_gateway() -> String {
    "https://exp.host/--/api/v2/push/send".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `MAPPOINT_ENV`)
    /// 4. Environment variables with `MAPPOINT__` prefix
    ///
    /// The result is validated, so missing secrets abort startup.
    pub fn load() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("MAPPOINT_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MAPPOINT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("MAPPOINT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations missing required secrets.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(AppError::Config("auth.jwt_secret must be set".to_string()));
        }
        if self.auth.google_client_id.trim().is_empty() {
            return Err(AppError::Config(
                "auth.google_client_id must be set".to_string(),
            ));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(AppError::Config(
                "auth.token_ttl_secs must be positive".to_string(),
            ));
        }
        if let ImageHostConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
        } = &self.images.host
            && [cloud_name, api_key, api_secret]
                .iter()
                .any(|v| v.trim().is_empty())
        {
            return Err(AppError::Config(
                "cloudinary credentials are incomplete".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
                body_limit: default_body_limit(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/mappoint".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "secret".to_string(),
                token_ttl_secs: 3600,
                google_client_id: "client.apps.googleusercontent.com".to_string(),
                google_tokeninfo_url: default_google_tokeninfo_url(),
                password_reset_ttl_secs: 3600,
                password_reset_url: None,
            },
            images: ImagesConfig::default(),
            push: PushConfig::default(),
            email: None,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_jwt_secret_fails() {
        let mut config = valid_config();
        config.auth.jwt_secret = "  ".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_google_client_fails() {
        let mut config = valid_config();
        config.auth.google_client_id = String::new();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_incomplete_cloudinary_fails() {
        let mut config = valid_config();
        config.images.host = ImageHostConfig::Cloudinary {
            cloud_name: "demo".to_string(),
            api_key: String::new(),
            api_secret: "s".to_string(),
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_defaults() {
        let push = PushConfig::default();
        assert!(push.gateway_url.starts_with("https://exp.host"));
        assert!(matches!(
            ImagesConfig::default().host,
            ImageHostConfig::Local { .. }
        ));
    }
}
