use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, Uri, header, request::Parts},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    media,
    pipeline::{
        GeneratedImageRecord, GenerationRequest, ImagePayload, ImageQuality, ImageSize, ImageStyle,
        PROXY_PATH,
    },
    quote::Quote,
    services::ImageStats,
    state::AppState,
    store::Document,
};

pub const OWNER_HEADER: &str = "x-user-id";

const PROXY_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate_image))
        .route("/quote", get(motivational_quote))
        .route(PROXY_PATH, get(proxy_image).post(proxy_image))
        .route("/test-url", post(test_image_url))
        .route("/download", post(download_image))
        .route("/images", get(list_images).post(save_image))
        .route("/images/stats", get(image_stats))
        .route("/images/{id}", delete(delete_image))
        .route("/favorites/quotes", get(list_favorite_quotes).post(save_favorite_quote))
        .route("/favorites/quotes/{id}", delete(delete_favorite_quote))
        .with_state(state)
}

/// Identity of the signed-in user, as forwarded by the authenticating front end.
pub struct Owner(pub String);

fn owner_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        owner_from_headers(&parts.headers)
            .map(Owner)
            .ok_or(AppError::Unauthenticated)
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn required(value: Option<String>, message: &str) -> AppResult<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
pub struct GenerateBody {
    prompt: Option<String>,
    #[serde(default)]
    size: ImageSize,
    #[serde(default)]
    quality: ImageQuality,
    #[serde(default)]
    style: ImageStyle,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    success: bool,
    image_url: String,
    proxy_url: String,
    prompt: String,
    size: ImageSize,
    quality: ImageQuality,
    style: ImageStyle,
    created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persist_warning: Option<String>,
}

async fn generate_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let body = json_body(payload)?;
    let prompt = required(body.prompt, "Prompt is required")?;
    let record = state
        .pipeline
        .generate(GenerationRequest {
            prompt,
            size: body.size,
            quality: body.quality,
            style: body.style,
        })
        .await?;

    // Saving is best effort: the image is already generated either way.
    let (saved_id, persist_warning) = match owner_from_headers(&headers) {
        Some(owner) => match state.pipeline.persist(&state.images, &owner, &record).await {
            Ok(id) => (Some(id), None),
            Err(err) => {
                warn!(error = %err, "generated image could not be saved");
                (None, Some(err.to_string()))
            }
        },
        None => (None, None),
    };

    let GeneratedImageRecord {
        remote_url,
        proxy_url,
        prompt,
        size,
        quality,
        style,
        created_at,
    } = record;
    Ok(Json(GenerateResponse {
        success: true,
        image_url: remote_url,
        proxy_url,
        prompt,
        size,
        quality,
        style,
        created_at: created_at.to_rfc3339(),
        saved_id,
        persist_warning,
    }))
}

async fn motivational_quote(State(state): State<Arc<AppState>>) -> Json<Quote> {
    Json(state.quotes.fetch_quote().await)
}

fn image_response(payload: ImagePayload, extra: Vec<(header::HeaderName, String)>) -> Response {
    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, payload.content_type)],
        payload.bytes,
    )
        .into_response();
    for (name, value) in extra {
        match value.parse::<header::HeaderValue>() {
            Ok(value) => {
                response.headers_mut().insert(name, value);
            }
            Err(err) => warn!(header = %name, error = %err, "dropping invalid response header"),
        }
    }
    response
}

async fn proxy_image(State(state): State<Arc<AppState>>, uri: Uri) -> AppResult<Response> {
    let reference = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or(PROXY_PATH);
    let payload = state.pipeline.proxy(reference).await?;
    Ok(image_response(
        payload,
        vec![(header::CACHE_CONTROL, PROXY_CACHE_CONTROL.to_string())],
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestUrlBody {
    image_url: Option<String>,
}

async fn test_image_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TestUrlBody>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let image_url = required(json_body(payload)?.image_url, "Image URL is required")?;
    let probe = state.pipeline.probe_accessibility(&image_url).await;
    if !probe.reachable {
        return Ok(Json(json!({
            "success": false,
            "error": probe.error.unwrap_or_else(|| "Image URL not accessible".to_string()),
            "status": probe.http_status,
        })));
    }
    Ok(Json(json!({
        "success": true,
        "accessible": true,
        "contentType": probe.content_type,
        "isImage": probe.looks_like_image,
        "contentLength": probe.content_length,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBody {
    image_url: Option<String>,
    filename: Option<String>,
}

async fn download_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DownloadBody>, JsonRejection>,
) -> AppResult<Response> {
    let body = json_body(payload)?;
    let image_url = required(body.image_url, "Image URL is required")?;
    let filename = media::sanitize_filename(body.filename.as_deref().unwrap_or_default());
    let payload = state.pipeline.download(&image_url).await?;
    info!(%filename, bytes = payload.bytes.len(), "serving image download");
    Ok(image_response(
        payload,
        vec![
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
    ))
}

#[derive(Deserialize)]
pub struct ListParams {
    limit: Option<usize>,
}

async fn list_images(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.images.list_generated_images(&owner, params.limit).await?))
}

async fn save_image(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    payload: Result<Json<GeneratedImageRecord>, JsonRejection>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let record = json_body(payload)?;
    let id = state.pipeline.persist(&state.images, &owner, &record).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn image_stats(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> AppResult<Json<ImageStats>> {
    Ok(Json(state.images.image_stats(&owner).await?))
}

async fn delete_image(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.images.delete_generated_image(&owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_favorite_quotes(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.favorites.list_favorite_quotes(&owner).await?))
}

async fn save_favorite_quote(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    payload: Result<Json<Quote>, JsonRejection>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let quote = json_body(payload)?;
    let id = state.favorites.save_favorite_quote(&owner, &quote).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn delete_favorite_quote(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.favorites.delete_favorite_quote(&owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
