//! Document store contract shared by every resource.
//!
//! Documents are JSON objects keyed by a UUID `id` field. Filters are exact
//! matches, plus an any-of clause for batched lookups and one case-insensitive
//! substring clause for title search. Updates are field-level: each staged
//! dotted path replaces only that sub-field of the stored document.

mod memory;
mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Events,
    Contributions,
    Hubs,
    Reviews,
    Favorites,
    Users,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Contributions => "contributions",
            Self::Hubs => "hubs",
            Self::Reviews => "reviews",
            Self::Favorites => "favorites",
            Self::Users => "users",
        }
    }

    /// Field tuples that must be unique across the collection.
    pub const fn unique_keys(self) -> &'static [&'static str] {
        match self {
            Self::Favorites => &["user_id", "hub_id"],
            _ => &[],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("duplicate key in {0}")]
    Duplicate(&'static str),

    #[error("malformed document in {collection}: {source}")]
    Decode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode document for {collection}: {source}")]
    Encode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Eq { field: String, value: String },
    AnyOf { field: String, values: Vec<String> },
    ContainsIgnoreCase { field: String, needle: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, field: &str, value: impl ToString) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.to_owned(),
            value: value.to_string(),
        });
        self
    }

    /// Matches documents whose `field` equals any of `values`. An empty set
    /// matches nothing.
    pub fn any_of<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.clauses.push(Clause::AnyOf {
            field: field.to_owned(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    pub fn title_contains(mut self, needle: &str) -> Self {
        self.clauses.push(Clause::ContainsIgnoreCase {
            field: "title".to_owned(),
            needle: needle.to_owned(),
        });
        self
    }

    pub fn and(mut self, other: Filter) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Evaluates the filter against an in-memory document.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq { field, value } => scalar(doc, field).as_deref() == Some(value.as_str()),
            Clause::AnyOf { field, values } => scalar(doc, field)
                .map(|v| values.iter().any(|candidate| *candidate == v))
                .unwrap_or(false),
            Clause::ContainsIgnoreCase { field, needle } => scalar(doc, field)
                .map(|v| v.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
        })
    }
}

/// Text form of a top-level scalar, matching Postgres' `doc ->> field`.
fn scalar(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Ordered field-level assignments; paths use `.` to address nested fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetFields {
    fields: Vec<(String, Value)>,
}

impl SetFields {
    pub fn push(&mut self, path: &str, value: Value) {
        match self.fields.iter_mut().find(|(p, _)| p == path) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((path.to_owned(), value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.iter().find(|(p, _)| p == path).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(p, v)| (p.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All matching documents, oldest first.
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError>;

    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<Uuid, StoreError>;

    /// Applies `set` to matching documents and returns the matched count.
    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        set: &SetFields,
    ) -> Result<u64, StoreError>;

    /// Removes matching documents and returns the deleted count.
    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_exact_and_substring() {
        let doc = json!({"id": "a", "user_id": "u1", "title": "Harvest Festival"});
        assert!(Filter::new().eq("user_id", "u1").matches(&doc));
        assert!(!Filter::new().eq("user_id", "u2").matches(&doc));
        assert!(Filter::new().title_contains("fest").matches(&doc));
        assert!(Filter::new().title_contains("HARVEST").matches(&doc));
        assert!(!Filter::new().title_contains("winter").matches(&doc));
        assert!(Filter::new()
            .eq("user_id", "u1")
            .title_contains("val")
            .matches(&doc));
    }

    #[test]
    fn any_of_with_no_values_matches_nothing() {
        let doc = json!({"id": "a"});
        assert!(!Filter::new().any_of("id", Vec::<String>::new()).matches(&doc));
        assert!(Filter::new().any_of("id", ["b", "a"]).matches(&doc));
    }

    #[test]
    fn missing_field_never_matches() {
        let doc = json!({"id": "a"});
        assert!(!Filter::new().eq("status", "ACTIVE").matches(&doc));
        assert!(!Filter::new().title_contains("").matches(&doc));
    }

    #[test]
    fn set_fields_keeps_last_assignment_per_path() {
        let mut set = SetFields::default();
        set.push("title", json!("a"));
        set.push("coordinates.lat", json!(1.5));
        set.push("title", json!("b"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("title"), Some(&json!("b")));
    }
}
