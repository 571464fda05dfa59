//! Image hosting abstraction for marker photos and profile pictures.
//!
//! Supports the local filesystem and the Cloudinary upload API.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::{ImageHostConfig, ImagesConfig};
use crate::{AppError, AppResult};

/// Longest edge accepted by the host; larger images are scaled down.
pub const MAX_IMAGE_EDGE: u32 = 1000;

/// An image stored on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    /// Public URL to serve the image from.
    pub url: String,
    /// Host-side identifier used for deletion.
    pub public_id: String,
}

/// Image host trait.
#[async_trait::async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image into `folder`.
    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<HostedImage>;

    /// Delete an image. Deleting an unknown image is not an error.
    async fn destroy(&self, public_id: &str) -> AppResult<()>;
}

/// Shared image host handle.
pub type ImageHostService = Arc<dyn ImageHost>;

/// Build the configured image host.
#[must_use]
pub fn build_image_host(config: &ImagesConfig) -> ImageHostService {
    match &config.host {
        ImageHostConfig::Local {
            base_path,
            base_url,
        } => Arc::new(LocalImageHost::new(base_path.clone(), base_url.clone())),
        ImageHostConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
        } => Arc::new(CloudinaryImageHost::new(
            cloud_name.clone(),
            api_key.clone(),
            api_secret.clone(),
        )),
    }
}

/// Local filesystem image host.
pub struct LocalImageHost {
    base_path: PathBuf,
    base_url: String,
}

impl LocalImageHost {
    /// Create a new local image host.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait::async_trait]
impl ImageHost for LocalImageHost {
    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        data: &[u8],
        _content_type: &str,
    ) -> AppResult<HostedImage> {
        let key = generate_storage_key(folder, file_name);
        let path = self.base_path.join(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write image: {e}")))?;

        Ok(HostedImage {
            url: self.public_url(&key),
            public_id: key,
        })
    }

    async fn destroy(&self, public_id: &str) -> AppResult<()> {
        let path = self.base_path.join(public_id);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete image: {e}")))?;
        }
        Ok(())
    }
}

/// Cloudinary image host using signed upload requests.
pub struct CloudinaryImageHost {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryDestroyResponse {
    result: String,
}

impl CloudinaryImageHost {
    /// Create a new Cloudinary image host.
    #[must_use]
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{action}",
            self.cloud_name
        )
    }
}

/// Sign request parameters the way Cloudinary expects.
///
/// Parameters are sorted by name, joined as `k=v` with `&`, suffixed with the
/// secret and hashed with SHA-256.
#[must_use]
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait::async_trait]
impl ImageHost for CloudinaryImageHost {
    async fn upload(
        &self,
        folder: &str,
        _file_name: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<HostedImage> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let transformation = format!("c_limit,h_{MAX_IMAGE_EDGE},w_{MAX_IMAGE_EDGE}");
        let signature = sign_params(
            &[
                ("folder", folder.to_string()),
                ("timestamp", timestamp.clone()),
                ("transformation", transformation.clone()),
            ],
            &self.api_secret,
        );

        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        let body = serde_json::json!({
            "file": format!("data:{content_type};base64,{encoded}"),
            "api_key": self.api_key,
            "folder": folder,
            "timestamp": timestamp,
            "transformation": transformation,
            "signature": signature,
            "signature_algorithm": "sha256",
        });

        let response = self
            .client
            .post(self.endpoint("upload"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Image upload failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Image upload rejected with status {}",
                response.status()
            )));
        }

        let uploaded: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid upload response: {e}")))?;

        Ok(HostedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> AppResult<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[
                ("public_id", public_id.to_string()),
                ("timestamp", timestamp.clone()),
            ],
            &self.api_secret,
        );

        let body = serde_json::json!({
            "public_id": public_id,
            "api_key": self.api_key,
            "timestamp": timestamp,
            "signature": signature,
            "signature_algorithm": "sha256",
        });

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Image deletion failed: {e}")))?;

        let outcome: CloudinaryDestroyResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid destroy response: {e}")))?;

        // "not found" means the image is already gone.
        match outcome.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(AppError::ExternalService(format!(
                "Image deletion returned {other}"
            ))),
        }
    }
}

/// Generate a unique storage key for an image.
#[must_use]
pub fn generate_storage_key(folder: &str, original_name: &str) -> String {
    use chrono::Utc;

    let now = Utc::now();
    let date_path = now.format("%Y/%m/%d").to_string();
    let timestamp = now.timestamp_millis();

    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && !ext.is_empty())
        .unwrap_or("bin");

    format!(
        "{}/{}/{}_{}.{}",
        folder.trim_matches('/'),
        date_path,
        timestamp,
        uuid::Uuid::new_v4().simple(),
        extension
    )
}
