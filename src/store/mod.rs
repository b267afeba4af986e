pub mod filter;
pub mod hash;
pub mod local;

use std::future::Future;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use filter::{FilterOp, QueryFilter};
pub use hash::new_document_id;
pub use local::LocalDocumentStore;

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

pub type Fields = Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Server-side timestamp in a form that sorts chronologically as text.
pub fn server_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generic document collection store: the only persistence the app needs.
pub trait DocumentStore: Send + Sync {
    /// Inserts `fields` under a fresh id, stamping creation and update times.
    fn add(&self, collection: &str, fields: Fields) -> impl Future<Output = Result<String>> + Send;

    fn get(&self, collection: &str, id: &str) -> impl Future<Output = Result<Option<Document>>> + Send;

    /// Merges `fields` into an existing document. Fails if it does not exist.
    fn update(&self, collection: &str, id: &str, fields: Fields) -> impl Future<Output = Result<()>> + Send;

    /// Deleting a missing document is not an error.
    fn delete(&self, collection: &str, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Documents matching every filter, newest first by `order_by_desc` when given.
    fn query(
        &self,
        collection: &str,
        filters: &[QueryFilter],
        order_by_desc: Option<&str>,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Document>>> + Send;
}
