//! Remote solving services for Spyglass
//!
//! Talks to the answer backend over JSON/HTTP with SSE streaming, and
//! prepares captured frames for upload.

pub mod client;
pub mod vision;

pub use client::BackendClient;
pub use vision::VisionService;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend error: {status} {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encode failed: {0}")]
    Image(#[from] image::ImageError),
}

pub type BackendResult<T> = Result<T, BackendError>;
