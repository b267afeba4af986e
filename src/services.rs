use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::AppError,
    pipeline::GeneratedImageRecord,
    quote::Quote,
    store::{Document, DocumentStore, Fields, QueryFilter, server_timestamp},
};

pub const GENERATED_IMAGES: &str = "generated_images";
pub const FAVORITE_QUOTES: &str = "favorite_quotes";

const OWNER_FIELD: &str = "userId";
const SAVED_AT: &str = "savedAt";
const DEFAULT_IMAGE_LIMIT: usize = 20;
const FAVORITE_QUOTE_LIMIT: usize = 50;
const STATS_SCAN_LIMIT: usize = 1000;
const RECENT_DAYS: i64 = 7;

fn to_fields<T: Serialize>(value: &T) -> Result<Fields, AppError> {
    match serde_json::to_value(value).map_err(anyhow::Error::from)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Storage(anyhow::anyhow!("record is not a JSON object"))),
    }
}

fn owned_fields<T: Serialize>(owner: &str, value: &T) -> Result<Fields, AppError> {
    let mut fields = to_fields(value)?;
    fields.insert(OWNER_FIELD.to_string(), Value::String(owner.to_string()));
    fields.insert(SAVED_AT.to_string(), Value::String(server_timestamp()));
    Ok(fields)
}

async fn delete_owned<S: DocumentStore>(
    store: &S,
    collection: &str,
    owner: &str,
    id: &str,
) -> Result<(), AppError> {
    let document = store.get(collection, id).await?;
    match document {
        Some(document) if document.get_str(OWNER_FIELD) == Some(owner) => {
            store.delete(collection, id).await?;
            Ok(())
        }
        _ => Err(AppError::NotFound(format!("{collection}/{id}"))),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStats {
    pub total_images: usize,
    pub recent_images: usize,
    pub last_generated: Option<String>,
}

#[derive(Debug)]
pub struct ImageService<S> {
    store: Arc<S>,
}

impl<S> Clone for ImageService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: DocumentStore> ImageService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn save_generated_image(
        &self,
        owner: &str,
        record: &GeneratedImageRecord,
    ) -> Result<String, AppError> {
        let fields = owned_fields(owner, record)?;
        Ok(self.store.add(GENERATED_IMAGES, fields).await?)
    }

    pub async fn list_generated_images(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, AppError> {
        Ok(self
            .store
            .query(
                GENERATED_IMAGES,
                &[QueryFilter::eq(OWNER_FIELD, owner)],
                Some(SAVED_AT),
                Some(limit.unwrap_or(DEFAULT_IMAGE_LIMIT)),
            )
            .await?)
    }

    pub async fn delete_generated_image(&self, owner: &str, id: &str) -> Result<(), AppError> {
        delete_owned(self.store.as_ref(), GENERATED_IMAGES, owner, id).await
    }

    pub async fn image_stats(&self, owner: &str) -> Result<ImageStats, AppError> {
        let images = self.list_generated_images(owner, Some(STATS_SCAN_LIMIT)).await?;
        let week_ago = Utc::now() - Duration::days(RECENT_DAYS);
        let recent_images = images
            .iter()
            .filter_map(|image| image.get_str(SAVED_AT))
            .filter_map(|saved| DateTime::parse_from_rfc3339(saved).ok())
            .filter(|saved| saved.with_timezone(&Utc) > week_ago)
            .count();
        Ok(ImageStats {
            total_images: images.len(),
            recent_images,
            last_generated: images
                .first()
                .and_then(|image| image.get_str(SAVED_AT))
                .map(str::to_string),
        })
    }
}

#[derive(Debug)]
pub struct QuoteService<S> {
    store: Arc<S>,
}

impl<S> Clone for QuoteService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: DocumentStore> QuoteService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn save_favorite_quote(&self, owner: &str, quote: &Quote) -> Result<String, AppError> {
        if quote.text.trim().is_empty() {
            return Err(AppError::Validation("Quote text is required".to_string()));
        }
        let fields = owned_fields(owner, quote)?;
        Ok(self.store.add(FAVORITE_QUOTES, fields).await?)
    }

    pub async fn list_favorite_quotes(&self, owner: &str) -> Result<Vec<Document>, AppError> {
        Ok(self
            .store
            .query(
                FAVORITE_QUOTES,
                &[QueryFilter::eq(OWNER_FIELD, owner)],
                Some(SAVED_AT),
                Some(FAVORITE_QUOTE_LIMIT),
            )
            .await?)
    }

    pub async fn delete_favorite_quote(&self, owner: &str, id: &str) -> Result<(), AppError> {
        delete_owned(self.store.as_ref(), FAVORITE_QUOTES, owner, id).await
    }
}
