//! Streaming download with optional SHA-256 verification.
//!
//! The body is hashed while it is written, so verification costs no second
//! pass over the file. A mismatch removes the partial file.

use std::io::Write;
use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Request for a download operation
#[derive(Debug)]
pub struct DownloadRequest<'a> {
    pub client: &'a Client,
    pub url: &'a str,
    pub dest: &'a Path,
    /// Hex SHA-256 the body must match; None skips the check.
    pub expected_hash: Option<&'a str>,
    /// Name shown in progress output.
    pub label: &'a str,
}

impl<'a> DownloadRequest<'a> {
    pub fn new(client: &'a Client, url: &'a str, dest: &'a Path) -> Self {
        Self {
            client,
            url,
            dest,
            expected_hash: None,
            label: crate::paths::filename_from_url(url),
        }
    }

    pub fn with_expected_hash(mut self, hash: Option<&'a str>) -> Self {
        self.expected_hash = hash;
        self
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    /// Stream the body to `dest`, returning its hex SHA-256.
    pub async fn execute<R: Reporter + ?Sized>(self, reporter: &R) -> Result<String, DownloadError> {
        tracing::debug!(url = self.url, dest = %self.dest.display(), "downloading");

        let response = self
            .client
            .get(self.url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let total_size = response.content_length();
        reporter.downloading(self.label, 0, total_size);

        let mut file = File::create(self.dest).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
            reporter.downloading(self.label, downloaded, total_size);
        }

        file.flush().await?;
        let actual_hash = hex::encode(hasher.finalize());

        if let Some(expected) = self.expected_hash {
            if !actual_hash.eq_ignore_ascii_case(expected.trim()) {
                tokio::fs::remove_file(self.dest).await.ok();
                return Err(DownloadError::HashMismatch {
                    expected: expected.trim().to_string(),
                    actual: actual_hash,
                });
            }
        }

        Ok(actual_hash)
    }
}
