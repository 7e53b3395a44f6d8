use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Clause, Collection, DocumentStore, Filter, SetFields, StoreError};

/// Postgres-backed store: one `(id UUID, doc JSONB)` table per collection.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for (i, clause) in filter.clauses().iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match clause {
            Clause::Eq { field, value } if field == "id" => match Uuid::parse_str(value) {
                Ok(id) => {
                    qb.push("id = ").push_bind(id);
                }
                Err(_) => {
                    qb.push("FALSE");
                }
            },
            Clause::Eq { field, value } => {
                qb.push("(doc ->> ")
                    .push_bind(field.clone())
                    .push(") = ")
                    .push_bind(value.clone());
            }
            Clause::AnyOf { field, values } => {
                qb.push("(doc ->> ")
                    .push_bind(field.clone())
                    .push(") = ANY(")
                    .push_bind(values.clone())
                    .push(")");
            }
            Clause::ContainsIgnoreCase { field, needle } => {
                qb.push("(doc ->> ")
                    .push_bind(field.clone())
                    .push(") ILIKE ")
                    .push_bind(like_pattern(needle));
            }
        }
    }
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_owned).collect()
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let mut qb = QueryBuilder::new(format!("SELECT doc FROM {}", collection.name()));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id");
        let rows: Vec<(Json<Value>,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(Json(doc),)| doc).collect())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let mut qb = QueryBuilder::new(format!("SELECT doc FROM {}", collection.name()));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id LIMIT 1");
        let row: Option<(Json<Value>,)> = qb.build_query_as().fetch_optional(&self.pool).await?;
        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<Uuid, StoreError> {
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", collection.name());
        let res = sqlx::query(&sql)
            .bind(id)
            .bind(Json(doc))
            .execute(&self.pool)
            .await;
        match res {
            Ok(_) => Ok(id),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(collection.name()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        set: &SetFields,
    ) -> Result<u64, StoreError> {
        // doc = jsonb_set(jsonb_set(doc, p1, v1, true), p2, v2, true) ...
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET doc = ", collection.name()));
        for _ in 0..set.len() {
            qb.push("jsonb_set(");
        }
        qb.push("doc");
        for (path, value) in set.iter() {
            qb.push(", ")
                .push_bind(path_segments(path))
                .push("::text[], ")
                .push_bind(Json(value.clone()))
                .push("::jsonb, true)");
        }
        push_filter(&mut qb, filter);
        let res = qb.build().execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new(format!("DELETE FROM {}", collection.name()));
        push_filter(&mut qb, filter);
        let res = qb.build().execute(&self.pool).await?;
        Ok(res.rows_affected())
    }
}
