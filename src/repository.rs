//! Typed access to one collection of the document store.
//!
//! Every call is bounded by a per-call timeout; an elapsed timeout surfaces as
//! [`StoreError::Timeout`] and never as a partial document.

use std::{future::Future, marker::PhantomData, sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::store::{Collection, DocumentStore, Filter, SetFields, StoreError};

/// A persisted resource.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
    /// Singular noun used in error messages.
    const NAME: &'static str;

    fn id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy)]
pub struct StoreTimeouts {
    pub read: Duration,
    pub list: Duration,
    pub write: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(5),
            list: Duration::from_secs(10),
            write: Duration::from_secs(5),
        }
    }
}

pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    timeouts: StoreTimeouts,
    _doc: PhantomData<fn() -> T>,
}

async fn bounded<F, R>(limit: Duration, fut: F) -> Result<R, StoreError>
where
    F: Future<Output = Result<R, StoreError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>, timeouts: StoreTimeouts) -> Self {
        Self {
            store,
            timeouts,
            _doc: PhantomData,
        }
    }

    fn decode(doc: Value) -> Result<T, StoreError> {
        serde_json::from_value(doc).map_err(|source| StoreError::Decode {
            collection: T::COLLECTION.name(),
            source,
        })
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let docs = bounded(self.timeouts.list, self.store.find(T::COLLECTION, filter)).await?;
        docs.into_iter().map(Self::decode).collect()
    }

    /// Looks a document up by id, optionally narrowed by `extra` (e.g. owner).
    pub async fn find_one(&self, id: Uuid, extra: Option<Filter>) -> Result<Option<T>, StoreError> {
        let mut filter = Filter::by_id(id);
        if let Some(extra) = extra {
            filter = filter.and(extra);
        }
        self.find_by(&filter).await
    }

    pub async fn find_by(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        bounded(self.timeouts.read, self.store.find_one(T::COLLECTION, filter))
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn insert(&self, doc: &T) -> Result<Uuid, StoreError> {
        let value = serde_json::to_value(doc).map_err(|source| StoreError::Encode {
            collection: T::COLLECTION.name(),
            source,
        })?;
        bounded(
            self.timeouts.write,
            self.store.insert(T::COLLECTION, doc.id(), value),
        )
        .await
    }

    /// Field-level update of one document. `guard` narrows the match, so a
    /// zero count means either the document is gone or the guard failed.
    pub async fn update(
        &self,
        id: Uuid,
        guard: Option<Filter>,
        set: &SetFields,
    ) -> Result<u64, StoreError> {
        let mut filter = Filter::by_id(id);
        if let Some(guard) = guard {
            filter = filter.and(guard);
        }
        bounded(
            self.timeouts.write,
            self.store.update(T::COLLECTION, &filter, set),
        )
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        self.delete_where(&Filter::by_id(id)).await
    }

    pub async fn delete_where(&self, filter: &Filter) -> Result<u64, StoreError> {
        bounded(self.timeouts.write, self.store.delete(T::COLLECTION, filter)).await
    }
}
