use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, DocumentStore, Filter, SetFields, StoreError};

/// Process-local store for development runs and tests. Each operation takes
/// the lock once, so single-document writes are atomic like in Postgres.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut cursor = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Value::Object(map) = cursor else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_owned(), value);
            return;
        }
        cursor = map
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn conflicts(collection: Collection, existing: &Value, candidate: &Value) -> bool {
    if existing.get("id") == candidate.get("id") {
        return true;
    }
    let keys = collection.unique_keys();
    !keys.is_empty()
        && keys
            .iter()
            .all(|k| existing.get(*k).is_some() && existing.get(*k) == candidate.get(*k))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn insert(
        &self,
        collection: Collection,
        id: Uuid,
        mut doc: Value,
    ) -> Result<Uuid, StoreError> {
        if let Value::Object(map) = &mut doc {
            map.insert("id".to_owned(), Value::String(id.to_string()));
        }
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        if docs.iter().any(|existing| conflicts(collection, existing, &doc)) {
            return Err(StoreError::Duplicate(collection.name()));
        }
        docs.push(doc);
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        set: &SetFields,
    ) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().await;
        let mut matched = 0;
        if let Some(docs) = guard.get_mut(&collection) {
            for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
                for (path, value) in set.iter() {
                    set_path(doc, path, value.clone());
                }
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }
}
