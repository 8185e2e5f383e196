//! MySQL-backed document store.
//!
//! Documents are rows in a single `documents` table with the entity kept in a
//! `JSON` column; filters compile to `JSON_EXTRACT` comparisons so the
//! business logic never sees SQL.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{MySqlPool, Row};

use super::{DocumentStore, Filter, Order, Sort, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
    collection VARCHAR(64) NOT NULL,
    doc_id VARCHAR(64) NOT NULL,
    doc JSON NOT NULL,
    UNIQUE KEY uq_collection_doc (collection, doc_id),
    KEY idx_collection (collection)
)
"#;

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = MySqlPool::connect(database_url).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

fn json_path(field: &str) -> String {
    format!("$.{field}")
}

/// JSON_UNQUOTE(JSON_EXTRACT(...)) yields the bare scalar as text, so filter
/// values are compared in their textual form ("true", "42", plain strings).
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn where_clause(filter: &Filter) -> (String, Vec<String>) {
    let mut sql = String::from("collection = ?");
    let mut binds = Vec::with_capacity(filter.len() * 2);
    for (field, value) in filter {
        sql.push_str(" AND JSON_UNQUOTE(JSON_EXTRACT(doc, ?)) = ?");
        binds.push(json_path(field));
        binds.push(scalar_text(value));
    }
    (sql, binds)
}

#[async_trait]
impl DocumentStore for MySqlStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let mut docs = self.find(collection, filter, None, Some(1)).await?;
        Ok(if docs.is_empty() { None } else { Some(docs.remove(0)) })
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<u64>,
    ) -> Result<Vec<Value>, StoreError> {
        let (where_sql, binds) = where_clause(filter);
        let mut sql = format!("SELECT CAST(doc AS CHAR) AS doc FROM documents WHERE {where_sql}");
        if let Some(sort) = sort {
            let dir = match sort.order {
                Order::Asc => "ASC",
                Order::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY JSON_EXTRACT(doc, ?) {dir}"));
        }
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut q = sqlx::query(&sql).bind(collection);
        for b in binds {
            q = q.bind(b);
        }
        if let Some(sort) = sort {
            q = q.bind(json_path(&sort.field));
        }
        if let Some(limit) = limit {
            q = q.bind(limit);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                let raw: String = row.try_get("doc")?;
                Ok(serde_json::from_str(&raw)?)
            })
            .collect()
    }

    async fn insert_one(&self, collection: &str, doc: &Value) -> Result<(), StoreError> {
        let doc_id = doc
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        sqlx::query("INSERT INTO documents (collection, doc_id, doc) VALUES (?, ?, CAST(? AS JSON))")
            .bind(collection)
            .bind(doc_id)
            .bind(doc.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Value,
    ) -> Result<u64, StoreError> {
        let Value::Object(fields) = patch else {
            return Ok(0);
        };
        if fields.is_empty() {
            return Ok(0);
        }

        let setters = vec!["?, CAST(? AS JSON)"; fields.len()].join(", ");
        let (where_sql, binds) = where_clause(filter);
        let sql = format!(
            "UPDATE documents SET doc = JSON_SET(doc, {setters}) WHERE {where_sql} ORDER BY id LIMIT 1"
        );

        let mut q = sqlx::query(&sql);
        for (field, value) in fields {
            q = q.bind(json_path(field)).bind(value.to_string());
        }
        q = q.bind(collection);
        for b in binds {
            q = q.bind(b);
        }

        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let (where_sql, binds) = where_clause(filter);
        let sql = format!("DELETE FROM documents WHERE {where_sql}");

        let mut q = sqlx::query(&sql).bind(collection);
        for b in binds {
            q = q.bind(b);
        }

        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let (where_sql, binds) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {where_sql}");

        let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(collection);
        for b in binds {
            q = q.bind(b);
        }

        let total = q.fetch_one(&self.pool).await?;
        Ok(total as u64)
    }
}
