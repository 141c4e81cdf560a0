//! Frame decoding
//!
//! ## Responsibilities
//!
//! - Extract an optical-code payload from one frame
//! - Communication with the decode service
//!
//! A decode miss is `Ok(None)`, never an error: the loop continues
//! unaffected. Transport failures against the decode service are also
//! reported as misses so flaky connectivity cannot kill the scan loop.

use super::camera::Frame;
use crate::error::Result;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Abstraction over a single-step 2D-barcode decoder.
pub trait FrameDecoder: Send + Sync + 'static {
    fn decode<'a>(
        &'a self,
        frame: &'a Frame,
    ) -> impl Future<Output = Result<Option<String>>> + Send + 'a;
}

/// Decode service response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeResponse {
    pub detected: bool,
    #[serde(default)]
    pub payload: Option<String>,
}

/// HTTP client for the decode service
pub struct DecodeClient {
    client: reqwest::Client,
    base_url: String,
}

impl DecodeClient {
    /// Create new decode client
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    /// Create new decode client with custom timeout
    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    /// Check decode service health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl FrameDecoder for DecodeClient {
    async fn decode(&self, frame: &Frame) -> Result<Option<String>> {
        let url = format!("{}/v1/decode", self.base_url);

        let form = Form::new()
            .part(
                "frame",
                Part::bytes(frame.data.clone())
                    .file_name("frame.jpg")
                    .mime_str("image/jpeg")?,
            )
            .text("captured_at", frame.captured_at.to_rfc3339());

        let resp = match self.client.post(&url).multipart(form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "Decode service unreachable, treating as miss");
                return Ok(None);
            }
        };

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "Decode service error, treating as miss");
            return Ok(None);
        }

        let result: DecodeResponse = match resp.json().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Decode response parse failed, treating as miss");
                return Ok(None);
            }
        };

        if !result.detected {
            return Ok(None);
        }

        Ok(result.payload.filter(|p| !p.trim().is_empty()))
    }
}
