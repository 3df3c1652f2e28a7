//! Cloudinary upload client
//!
//! Signed uploads through the REST endpoint
//! `POST {api_base}/{cloud_name}/{resource_type}/upload`.

use super::{HostedAsset, MediaError, MediaHost};
use crate::config::MediaConfig;
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

/// Error body Cloudinary returns on 4xx/5xx.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryHost {
    client: Client,
    config: MediaConfig,
}

impl CloudinaryHost {
    pub fn new(config: MediaConfig) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/{}/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            self.config.resource_type
        )
    }

    /// Parameters that take part in the signature, besides `timestamp`.
    fn signed_params(&self, timestamp: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![("timestamp", timestamp.to_string())];
        if !self.config.folder.is_empty() {
            params.push(("folder", self.config.folder.clone()));
        }
        params
    }
}

/// Compute a Cloudinary request signature.
///
/// Parameters are sorted by name, empty values dropped, joined as
/// `k=v&k=v`, suffixed with the API secret and hashed with SHA-256.
/// `file`, `api_key`, `resource_type` and `cloud_name` are never signed.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Sha256::digest(format!("{}{}", to_sign, api_secret).as_bytes());
    format!("{:x}", digest)
}

/// Pull the human readable message out of an error response body.
fn rejection_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, path: &Path, file_name: &str) -> Result<HostedAsset, MediaError> {
        if !self.is_configured() {
            return Err(MediaError::NotConfigured);
        }

        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();
        let timestamp = chrono::Utc::now().timestamp();
        let params = self.signed_params(timestamp);
        let signature = sign_params(&params, &self.config.api_secret);

        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = self.upload_url();
        debug!(url = %url, file_name = %file_name, size_bytes = size, "Sending file to Cloudinary");

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = rejection_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            error!(status = status.as_u16(), message = %message, "Cloudinary upload failed");
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let asset: HostedAsset = response
            .json()
            .await
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;

        if asset.secure_url.is_empty() {
            return Err(MediaError::InvalidResponse("missing secure_url".to_string()));
        }

        info!(
            public_id = %asset.public_id,
            secure_url = %asset.secure_url,
            bytes = asset.bytes,
            "Cloudinary upload complete"
        );
        Ok(asset)
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}
