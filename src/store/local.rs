use std::{cmp::Ordering, path::PathBuf};

use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use super::{
    CREATED_AT, Document, DocumentStore, Fields, QueryFilter, UPDATED_AT, filter::compare,
    new_document_id, server_timestamp,
};

/// Documents as pretty JSON files, one directory per collection.
#[derive(Clone, Debug)]
pub struct LocalDocumentStore {
    base_dir: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        ensure_segment(collection)?;
        Ok(self.base_dir.join(collection))
    }

    fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf> {
        ensure_segment(id)?;
        Ok(self.collection_dir(collection)?.join(format!("{id}.json")))
    }

    async fn write(&self, collection: &str, document: &Document) -> Result<()> {
        let path = self.document_path(collection, &document.id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(document)?;
        fs::write(path, payload).await?;
        Ok(())
    }

    async fn read_all(&self, collection: &str) -> Result<Vec<Document>> {
        let dir_path = self.collection_dir(collection)?;
        let mut dir = match fs::read_dir(&dir_path).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut documents = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<Document>(&bytes) {
                Ok(document) => documents.push(document),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable document"),
            }
        }
        Ok(documents)
    }
}

impl DocumentStore for LocalDocumentStore {
    async fn add(&self, collection: &str, mut fields: Fields) -> Result<String> {
        let now = server_timestamp();
        fields.insert(CREATED_AT.to_string(), Value::String(now.clone()));
        fields.insert(UPDATED_AT.to_string(), Value::String(now));
        let id = new_document_id(collection, &Value::Object(fields.clone()).to_string());
        let document = Document { id, fields };
        self.write(collection, &document).await?;
        debug!(collection, id = %document.id, "document added");
        Ok(document.id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let path = self.document_path(collection, id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let mut document = self
            .get(collection, id)
            .await?
            .ok_or_else(|| anyhow!("document {collection}/{id} does not exist"))?;
        document.fields.extend(fields);
        document
            .fields
            .insert(UPDATED_AT.to_string(), Value::String(server_timestamp()));
        self.write(collection, &document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let path = self.document_path(collection, id)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[QueryFilter],
        order_by_desc: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .read_all(collection)
            .await?
            .into_iter()
            .filter(|document| filters.iter().all(|filter| filter.matches(document)))
            .collect();
        match order_by_desc {
            Some(field) => documents.sort_by(|a, b| {
                let ordering = match (a.fields.get(field), b.fields.get(field)) {
                    (Some(left), Some(right)) => compare(right, left).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            }),
            None => documents.sort_by(|a, b| a.id.cmp(&b.id)),
        }
        if let Some(limit) = limit {
            documents.truncate(limit);
        }
        Ok(documents)
    }
}

fn ensure_segment(value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if !valid {
        bail!("invalid collection or document name: {value:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn add_get_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path().to_path_buf());

        let id = store.add("notes", fields(json!({"text": "hi"}))).await.unwrap();
        let document = store.get("notes", &id).await.unwrap().unwrap();
        assert_eq!(document.get_str("text"), Some("hi"));
        assert!(document.get_str(CREATED_AT).is_some());

        store
            .update("notes", &id, fields(json!({"text": "bye"})))
            .await
            .unwrap();
        let updated = store.get("notes", &id).await.unwrap().unwrap();
        assert_eq!(updated.get_str("text"), Some("bye"));
        assert_eq!(updated.get_str(CREATED_AT), document.get_str(CREATED_AT));

        store.delete("notes", &id).await.unwrap();
        assert!(store.get("notes", &id).await.unwrap().is_none());
        store.delete("notes", &id).await.unwrap();
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path().to_path_buf());
        assert!(store.update("notes", "missing", Fields::new()).await.is_err());
    }

    #[tokio::test]
    async fn query_filters_orders_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path().to_path_buf());
        for (owner, rank) in [("a", 1), ("b", 2), ("a", 3), ("a", 2)] {
            store
                .add("items", fields(json!({"userId": owner, "rank": rank})))
                .await
                .unwrap();
        }

        let documents = store
            .query("items", &[QueryFilter::eq("userId", "a")], Some("rank"), Some(2))
            .await
            .unwrap();
        let ranks: Vec<i64> = documents
            .iter()
            .filter_map(|document| document.fields.get("rank").and_then(Value::as_i64))
            .collect();
        assert_eq!(ranks, vec![3, 2]);
    }

    #[tokio::test]
    async fn empty_collection_queries_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path().to_path_buf());
        assert!(store.query("nothing", &[], None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_path_traversal_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path().to_path_buf());
        assert!(store.get("notes", "../secret").await.is_err());
        assert!(store.add("../notes", Fields::new()).await.is_err());
    }
}
