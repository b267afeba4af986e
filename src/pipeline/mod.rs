//! Image generation and delivery: submit a prompt to the provider, hand the
//! client a same-origin proxy reference, and relay or download the bytes.

pub mod proxy_ref;
pub mod state;
pub mod types;

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Response, header};
use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    media,
    openai::OpenAiClient,
    services::ImageService,
    store::DocumentStore,
};

pub use proxy_ref::{PROXY_PATH, decode_proxy_url, encode_proxy_url, validate_http_url};
pub use state::{ViewEvent, ViewState, transition};
pub use types::*;

/// Largest image body relayed or downloaded.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ImageRequestPipeline {
    provider: OpenAiClient,
    http: Client,
    generation_timeout: Duration,
    fetch_timeout: Duration,
    max_image_bytes: usize,
}

impl ImageRequestPipeline {
    pub fn new(
        provider: OpenAiClient,
        http: Client,
        generation_timeout: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            http,
            generation_timeout,
            fetch_timeout,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImageRecord, AppError> {
        let prompt = request.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(AppError::Validation("Prompt is required".to_string()));
        }
        let request = GenerationRequest { prompt, ..request };

        let remote_url = self
            .provider
            .generate_image(&request, self.generation_timeout)
            .await?;
        info!(size = request.size.as_str(), "image generated");

        Ok(GeneratedImageRecord {
            proxy_url: encode_proxy_url(&remote_url),
            remote_url,
            prompt: request.prompt,
            size: request.size,
            quality: request.quality,
            style: request.style,
            created_at: Utc::now(),
        })
    }

    /// Fetches the image a proxy reference points at. A reference that cannot
    /// be decoded is rejected before any outbound request.
    ///
    /// Upstream failures come back as a gateway error; the upstream status
    /// only shows up in the message.
    pub async fn proxy(&self, reference: &str) -> Result<ImagePayload, AppError> {
        let remote_url = decode_proxy_url(reference)?;
        self.fetch_image(&remote_url).await.map_err(|err| match err {
            AppError::Fetch {
                status: Some(status),
                message,
            } => AppError::Fetch {
                status: None,
                message: format!("upstream returned {status}: {message}"),
            },
            other => other,
        })
    }

    /// Header-only reachability check. Failures end up in the result, never in `Err`.
    pub async fn probe_accessibility(&self, remote_url: &str) -> AccessibilityProbeResult {
        let url = match validate_http_url(remote_url) {
            Ok(url) => url,
            Err(err) => {
                return AccessibilityProbeResult {
                    error: Some(err.to_string()),
                    ..Default::default()
                };
            }
        };

        let response = match self
            .http
            .head(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "image url probe failed");
                return AccessibilityProbeResult {
                    error: Some(err.to_string()),
                    ..Default::default()
                };
            }
        };

        let status = response.status();
        let content_type = header_str(&response, header::CONTENT_TYPE);
        let content_length = header_str(&response, header::CONTENT_LENGTH)
            .and_then(|value| value.parse::<u64>().ok());
        let looks_like_image = content_type.as_deref().is_some_and(media::is_image_mime);
        let reachable = status.is_success();
        AccessibilityProbeResult {
            reachable,
            http_status: Some(status.as_u16()),
            error: (!reachable).then(|| {
                format!(
                    "Image URL not accessible: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )
            }),
            content_type,
            content_length,
            looks_like_image,
        }
    }

    /// Fetches the image for saving. `image_url` may be the remote URL or a proxy reference.
    pub async fn download(&self, image_url: &str) -> Result<ImagePayload, AppError> {
        let remote_url = if proxy_ref::is_proxy_reference(image_url) {
            decode_proxy_url(image_url)?
        } else {
            validate_http_url(image_url)?.to_string()
        };
        self.fetch_image(&remote_url).await
    }

    /// Saves a copy of `record` for `owner`.
    pub async fn persist<S: DocumentStore>(
        &self,
        images: &ImageService<S>,
        owner: &str,
        record: &GeneratedImageRecord,
    ) -> Result<String, AppError> {
        images.save_generated_image(owner, record).await
    }

    async fn fetch_image(&self, remote_url: &str) -> Result<ImagePayload, AppError> {
        debug!(url = remote_url, "fetching remote image");
        let mut response = self
            .http
            .get(remote_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|err| AppError::Fetch {
                status: None,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "remote image fetch failed");
            return Err(AppError::Fetch {
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("upstream error").to_string(),
            });
        }

        let too_large = || AppError::Fetch {
            status: None,
            message: format!("image exceeds {} bytes", self.max_image_bytes),
        };
        if response
            .content_length()
            .is_some_and(|length| length > self.max_image_bytes as u64)
        {
            warn!(limit = self.max_image_bytes, "remote image too large");
            return Err(too_large());
        }

        let upstream_type = header_str(&response, header::CONTENT_TYPE);
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|err| AppError::Fetch {
            status: None,
            message: format!("read image bytes failed: {err}"),
        })? {
            if bytes.len() + chunk.len() > self.max_image_bytes {
                warn!(limit = self.max_image_bytes, "remote image too large");
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        let content_type = media::resolve_content_type(upstream_type.as_deref(), &bytes);
        Ok(ImagePayload {
            bytes,
            content_type,
        })
    }
}

fn header_str(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
