//! `SQLite` implementation of the `EntityStore` trait.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use keystone_core::domain::UPDATED_AT_FIELD;
use keystone_core::query::{Filter, Query};
use keystone_core::{Entity, EntityId, EntityStore, RepositoryError};

use super::sql::{checked_table, map_sqlx_error, push_order, push_where, push_window, to_sql_int};

/// `SQLite` implementation of the `EntityStore` trait.
///
/// Each entity type gets its own table keyed by `id`, holding the entity's
/// JSON document in `data`. `created_at`/`updated_at` are mirrored into
/// columns so they can be inspected without parsing the document.
pub struct SqliteEntityStore<T> {
    pool: SqlitePool,
    table: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> SqliteEntityStore<T> {
    /// Create a store for `T::COLLECTION`.
    ///
    /// Fails if the collection name is not a plain identifier.
    pub fn new(pool: SqlitePool) -> Result<Self, RepositoryError> {
        let table = checked_table(T::COLLECTION)?;
        Ok(Self {
            pool,
            table,
            _entity: PhantomData,
        })
    }

    /// Ensure the backing table exists.
    ///
    /// Call this during initialization to set up the schema.
    pub async fn ensure_table(&self) -> Result<(), RepositoryError> {
        ensure_collection(&self.pool, self.table).await
    }

    pub const fn table(&self) -> &'static str {
        self.table
    }

    fn decode(&self, data: &str) -> Result<T, RepositoryError> {
        serde_json::from_str(data).map_err(|e| {
            RepositoryError::Serialization(format!("{} document: {e}", self.table))
        })
    }

    fn decode_all(&self, rows: &[String]) -> Result<Vec<T>, RepositoryError> {
        rows.iter().map(|data| self.decode(data)).collect()
    }

    fn select(&self, query: &Query) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(format!(r#"SELECT data FROM "{}""#, self.table));
        push_where(&mut builder, &query.filters);
        push_order(&mut builder, &query.order_by);
        builder
    }
}

/// Create the document table for a collection if it does not exist.
pub async fn ensure_collection(pool: &SqlitePool, collection: &str) -> Result<(), RepositoryError> {
    let table = checked_table(collection)?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{table}" (
            id TEXT PRIMARY KEY NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(map_sqlx_error)?;

    tracing::debug!(collection = table, "Ensured collection table");
    Ok(())
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Row values for an entity: `(id, created_at, data)` with `updated_at` refreshed.
fn to_row<T: Entity>(entity: &T, now: &str) -> Result<(String, String, String), RepositoryError> {
    let mut doc =
        serde_json::to_value(entity).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    let Value::Object(fields) = &mut doc else {
        return Err(RepositoryError::Serialization(format!(
            "{} entity did not serialize to an object",
            T::COLLECTION
        )));
    };

    fields.insert(UPDATED_AT_FIELD.to_string(), Value::from(now));
    let created_at = fields
        .get("created_at")
        .and_then(Value::as_str)
        .unwrap_or(now)
        .to_string();

    Ok((entity.id().to_string(), created_at, doc.to_string()))
}

/// JSON merge patch (RFC 7396): objects merge recursively, `null` removes a key.
fn apply_merge_patch(target: &mut Value, patch: Value) {
    let Value::Object(patch) = patch else {
        *target = patch;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(doc) = target {
        for (key, value) in patch {
            if value.is_null() {
                doc.remove(&key);
            } else {
                apply_merge_patch(doc.entry(key).or_insert(Value::Null), value);
            }
        }
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for SqliteEntityStore<T> {
    async fn upsert(&self, entities: &[T]) -> Result<(), RepositoryError> {
        let now = timestamp_now();
        let sql = format!(
            r#"INSERT INTO "{}" (id, data, created_at, updated_at) VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"#,
            self.table
        );

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for entity in entities {
            let (id, created_at, data) = to_row(entity, &now)?;
            sqlx::query(&sql)
                .bind(id)
                .bind(data)
                .bind(created_at)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(table = self.table, count = entities.len(), "Upserted entities");
        Ok(())
    }

    async fn find_by_id(&self, id: &EntityId) -> Result<Option<T>, RepositoryError> {
        let row: Option<String> =
            sqlx::query_scalar(&format!(r#"SELECT data FROM "{}" WHERE id = ?"#, self.table))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(|data| self.decode(&data)).transpose()
    }

    async fn delete_by_ids(&self, ids: &[EntityId]) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!(r#"DELETE FROM "{}" WHERE id IN ("#, self.table));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str().to_string());
        }
        separated.push_unseparated(")");

        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_where(&self, filter: &Filter) -> Result<(), RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(r#"DELETE FROM "{}""#, self.table));
        push_where(&mut builder, std::slice::from_ref(filter));

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(
            table = self.table,
            field = %filter.field,
            removed = result.rows_affected(),
            "Deleted entities by field"
        );
        Ok(())
    }

    /// Applies the patch in a transaction and writes it only if the merged
    /// document still decodes as `T`. A missing id writes nothing.
    async fn merge(
        &self,
        id: &EntityId,
        mut fields: Map<String, Value>,
    ) -> Result<(), RepositoryError> {
        let now = timestamp_now();
        fields.insert(UPDATED_AT_FIELD.to_string(), Value::from(now.as_str()));

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let current: Option<String> =
            sqlx::query_scalar(&format!(r#"SELECT data FROM "{}" WHERE id = ?"#, self.table))
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        let Some(current) = current else {
            return Ok(());
        };

        let mut doc: Value = serde_json::from_str(&current).map_err(|e| {
            RepositoryError::Serialization(format!("{} document: {e}", self.table))
        })?;
        apply_merge_patch(&mut doc, Value::Object(fields));
        let data = doc.to_string();
        // Dropping the transaction rolls back
        self.decode(&data)?;

        sqlx::query(&format!(
            r#"UPDATE "{}" SET data = ?, updated_at = ? WHERE id = ?"#,
            self.table
        ))
        .bind(data)
        .bind(&now)
        .bind(id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_one(&self, query: &Query) -> Result<Option<T>, RepositoryError> {
        let mut builder = self.select(query);
        let offset = query.window.map_or(0, |w| w.offset);
        builder
            .push(" LIMIT 1 OFFSET ")
            .push_bind(to_sql_int(offset));

        let row: Option<String> = builder
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|data| self.decode(&data)).transpose()
    }

    async fn find(&self, query: &Query) -> Result<Vec<T>, RepositoryError> {
        let mut builder = self.select(query);
        push_window(&mut builder, query.window);

        let rows: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        self.decode_all(&rows)
    }

    async fn count(&self, filters: &[Filter]) -> Result<u64, RepositoryError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!(r#"SELECT COUNT(*) FROM "{}""#, self.table));
        push_where(&mut builder, filters);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
