//! SQL fragments for document queries.
//!
//! Entities are stored as JSON documents; filters and sort keys address
//! top-level document fields through `json_extract`. Field and table names
//! are validated identifiers before they are spliced into SQL, and values
//! are always bound.

use keystone_core::RepositoryError;
use keystone_core::domain::PageWindow;
use keystone_core::query::{Filter, Match, OrderBy, is_identifier};
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::{QueryBuilder, Sqlite};

/// `json_extract` expression for a validated top-level field.
pub fn field_expr(field: &str) -> String {
    format!("json_extract(data, '$.{field}')")
}

pub fn checked_table(name: &str) -> Result<&str, RepositoryError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(RepositoryError::InvalidQuery(format!(
            "invalid collection name '{name}'"
        )))
    }
}

pub fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => builder.push("NULL"),
        Value::Bool(b) => builder.push_bind(*b),
        Value::String(s) => builder.push_bind(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => builder.push_bind(i),
            None => builder.push_bind(n.as_f64().unwrap_or_default()),
        },
        // json_extract yields arrays and objects as minified JSON text
        other => builder.push_bind(other.to_string()),
    };
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
    let expr = field_expr(&filter.field);
    match &filter.matcher {
        Match::One(Value::Null) => {
            builder.push(expr).push(" IS NULL");
        }
        Match::One(value) => {
            builder.push(expr).push(" = ");
            push_value(builder, value);
        }
        Match::Any(values) if values.is_empty() => {
            builder.push("0");
        }
        Match::Any(values) => {
            // IN (NULL) never matches, so null entries become IS NULL
            let (nulls, values): (Vec<&Value>, Vec<&Value>) =
                values.iter().partition(|value| value.is_null());
            match (nulls.is_empty(), values.is_empty()) {
                (false, true) => {
                    builder.push(expr).push(" IS NULL");
                }
                (true, _) => push_in(builder, &expr, &values),
                (false, false) => {
                    builder.push("(");
                    push_in(builder, &expr, &values);
                    builder.push(" OR ").push(expr).push(" IS NULL)");
                }
            }
        }
    }
}

fn push_in(builder: &mut QueryBuilder<'_, Sqlite>, expr: &str, values: &[&Value]) {
    builder.push(expr).push(" IN (");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(builder, value);
    }
    builder.push(")");
}

/// Append a `WHERE` clause joining the filters with `AND`.
pub fn push_where(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        push_filter(builder, filter);
    }
}

/// Append `ORDER BY`, always ending on `id` so equal keys keep creation order.
pub fn push_order(builder: &mut QueryBuilder<'_, Sqlite>, order_by: &[OrderBy]) {
    builder.push(" ORDER BY ");
    for order in order_by {
        builder
            .push(field_expr(&order.field))
            .push(" ")
            .push(order.order.as_sql())
            .push(", ");
    }
    builder.push("id ASC");
}

pub fn push_window(builder: &mut QueryBuilder<'_, Sqlite>, window: Option<PageWindow>) {
    if let Some(window) = window {
        builder
            .push(" LIMIT ")
            .push_bind(to_sql_int(window.limit))
            .push(" OFFSET ")
            .push_bind(to_sql_int(window.offset));
    }
}

/// SQLite integers are signed; larger values saturate.
pub fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Map `sqlx` errors to `RepositoryError`.
pub fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => RepositoryError::AlreadyExists(db.message().to_string()),
            ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => RepositoryError::Constraint(db.message().to_string()),
            _ => RepositoryError::Storage(e.to_string()),
        },
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryError::Serialization(e.to_string())
        }
        _ => RepositoryError::Storage(e.to_string()),
    }
}
