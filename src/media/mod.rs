//! # Media Host Module
//!
//! Forwards spooled audio files to the third-party media host and returns the
//! public reference URL that gets logged in the database.
//!
//! ## Key Components:
//! - **MediaHost trait**: the seam between the upload handler and the vendor,
//!   so handler tests can swap in a fake host
//! - **CloudinaryHost**: signed REST uploads to Cloudinary
//! - **MediaError**: failures reported by the host or the transport

pub mod cloudinary; // Cloudinary REST client

pub use cloudinary::CloudinaryHost;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// An asset the media host has accepted.
///
/// `secure_url` is the only field that is persisted; the rest is logged and
/// echoed for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedAsset {
    pub secure_url: String,
    pub public_id: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub format: Option<String>,
    /// Duration in seconds, when the host could probe it
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media host credentials are not configured")]
    NotConfigured,
    #[error("HTTP request to media host failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Media host rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected media host response: {0}")]
    InvalidResponse(String),
}

/// Something that can store a local file and hand back a public URL.
///
/// ## Rust Concepts:
/// - **#[async_trait]**: lets the trait carry `async fn` while staying usable
///   as `Arc<dyn MediaHost>` inside the shared application state
/// - **Send + Sync**: the host is shared by every actix worker thread
#[async_trait]
pub trait MediaHost: Send + Sync + fmt::Debug {
    /// Upload the file at `path`, presenting it to the host as `file_name`.
    async fn upload(&self, path: &Path, file_name: &str) -> Result<HostedAsset, MediaError>;

    /// Short vendor name for health output.
    fn name(&self) -> &'static str;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;
}
