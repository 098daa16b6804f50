//! Readiness probe backend that inspects HTTP metadata
//!
//! A resource is considered playable when a metadata request succeeds and
//! the advertised content type is something a video player can open.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Client, StatusCode};
use tracing::debug;
use vscroll_common::VideoId;

use super::{AssetLoader, PreparedAsset};
use crate::error::{ProbeError, Result};

const USER_AGENT: &str = concat!("vscroll-feed/", env!("CARGO_PKG_VERSION"));

/// Content types accepted as playable besides `video/*`
const STREAM_TYPES: &[&str] = &[
    "application/octet-stream",
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
];

/// Decide from a Content-Type header value whether the resource is playable
///
/// A missing header is accepted; players sniff the container themselves.
pub fn classify_content_type(content_type: Option<&str>) -> std::result::Result<(), ProbeError> {
    let Some(raw) = content_type else {
        return Ok(());
    };
    let mime = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime.starts_with("video/") || STREAM_TYPES.contains(&mime.as_str()) {
        Ok(())
    } else {
        Err(ProbeError::Unplayable {
            reason: format!("content type {}", mime),
        })
    }
}

/// [`AssetLoader`] that issues a HEAD request per resource locator
#[derive(Clone)]
pub struct HttpAssetLoader {
    client: Client,
}

impl HttpAssetLoader {
    /// Build a loader whose requests give up after `request_timeout`
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn probe(client: Client, video_id: VideoId) -> std::result::Result<PreparedAsset, ProbeError> {
        let url = reqwest::Url::parse(video_id.as_str()).map_err(|e| ProbeError::Unplayable {
            reason: format!("invalid locator: {}", e),
        })?;

        let mut response = client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        // Some origins refuse HEAD; a one-byte ranged GET returns the same headers
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            debug!("HEAD refused for {}, retrying with ranged GET", video_id);
            response = client
                .get(url)
                .header(RANGE, "bytes=0-0")
                .send()
                .await
                .map_err(|e| ProbeError::Network(e.to_string()))?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Unplayable {
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        classify_content_type(content_type)?;

        debug!(
            "Probe of {} succeeded ({})",
            video_id,
            content_type.unwrap_or("no content type")
        );
        Ok(PreparedAsset::new(video_id))
    }
}

impl AssetLoader for HttpAssetLoader {
    fn load_playable(
        &self,
        video_id: &VideoId,
    ) -> BoxFuture<'static, std::result::Result<PreparedAsset, ProbeError>> {
        Self::probe(self.client.clone(), video_id.clone()).boxed()
    }
}
