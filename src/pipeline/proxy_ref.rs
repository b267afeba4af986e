use url::{Url, form_urlencoded};

use crate::error::AppError;

pub const PROXY_PATH: &str = "/proxy";

// Only used to resolve relative references; never contacted.
const REFERENCE_BASE: &str = "http://localhost";

pub fn validate_http_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Image URL is required".to_string()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| AppError::Validation(format!("Invalid image URL: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::Validation(format!(
            "Only http and https URLs are allowed, got {scheme}"
        ))),
    }
}

/// Builds the same-origin reference for `remote_url`.
pub fn encode_proxy_url(remote_url: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(remote_url.as_bytes()).collect();
    format!("{PROXY_PATH}?url={encoded}")
}

pub fn is_proxy_reference(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed == PROXY_PATH || trimmed.starts_with(&format!("{PROXY_PATH}?"))
}

/// Recovers the remote URL embedded in a proxy reference. Accepts the relative
/// form produced by [`encode_proxy_url`] or an absolute URL on any host whose
/// path is the proxy path. The embedded URL is returned exactly as encoded.
pub fn decode_proxy_url(reference: &str) -> Result<String, AppError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Proxy reference is empty".to_string()));
    }
    let base = Url::parse(REFERENCE_BASE).map_err(|err| AppError::Validation(err.to_string()))?;
    let parsed = base
        .join(trimmed)
        .map_err(|err| AppError::Validation(format!("Invalid proxy reference: {err}")))?;
    if parsed.path() != PROXY_PATH {
        return Err(AppError::Validation(format!(
            "Proxy reference must target {PROXY_PATH}"
        )));
    }
    let embedded = parsed
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| AppError::Validation("Proxy reference carries no url parameter".to_string()))?;
    validate_http_url(&embedded)?;
    Ok(embedded)
}
