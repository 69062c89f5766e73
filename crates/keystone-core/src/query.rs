//! Query options passed from repositories to the entity store.
//!
//! Callers build [`FindOneOptions`] or [`FindManyOptions`]; the repository
//! turns them into a store-facing [`Query`] after validating field names and
//! sanitizing pagination.

use serde_json::Value;

use crate::domain::{PageWindow, PaginationParams, SortOrder};
use crate::ports::RepositoryError;

/// Values a field is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    /// Field equals the value (`null` matches a missing or null field).
    One(Value),
    /// Field equals any of the values. A `null` entry matches a missing or
    /// null field, as with [`Match::One`].
    Any(Vec<Value>),
}

impl Match {
    /// True when the match can never select a row.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Any(values) if values.is_empty())
    }
}

impl From<Value> for Match {
    fn from(value: Value) -> Self {
        Self::One(value)
    }
}

impl From<&str> for Match {
    fn from(value: &str) -> Self {
        Self::One(Value::from(value))
    }
}

impl From<String> for Match {
    fn from(value: String) -> Self {
        Self::One(Value::from(value))
    }
}

impl From<Vec<Value>> for Match {
    fn from(values: Vec<Value>) -> Self {
        Self::Any(values)
    }
}

impl From<Vec<String>> for Match {
    fn from(values: Vec<String>) -> Self {
        Self::Any(values.into_iter().map(Value::from).collect())
    }
}

impl From<&[&str]> for Match {
    fn from(values: &[&str]) -> Self {
        Self::Any(values.iter().copied().map(Value::from).collect())
    }
}

/// Predicate on a single top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub matcher: Match,
}

impl Filter {
    pub fn new(field: impl Into<String>, matcher: impl Into<Match>) -> Self {
        Self {
            field: field.into(),
            matcher: matcher.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Match::One(value.into()))
    }

    pub fn any_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(field, Match::Any(values.into_iter().map(Into::into).collect()))
    }
}

/// Sort key on a top-level document field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Predicate lookup without a page window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOneOptions {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
}

impl FindOneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }
}

/// Paginated predicate lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyOptions {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub pagination: Option<PaginationParams>,
}

impl FindManyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    #[must_use]
    pub const fn paginate(mut self, params: PaginationParams) -> Self {
        self.pagination = Some(params);
        self
    }
}

/// Store-facing query: validated fields and a bounded window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub window: Option<PageWindow>,
}

impl Query {
    pub fn from_find_one(options: &FindOneOptions) -> Result<Self, RepositoryError> {
        validate_filters(&options.filters)?;
        validate_order(&options.order_by)?;
        Ok(Self {
            filters: options.filters.clone(),
            order_by: options.order_by.clone(),
            window: None,
        })
    }

    pub fn from_find_many(options: &FindManyOptions) -> Result<Self, RepositoryError> {
        validate_filters(&options.filters)?;
        validate_order(&options.order_by)?;

        let mut order_by = options.order_by.clone();
        if order_by.is_empty() {
            if let Some(order) = options.pagination.and_then(|p| p.order) {
                order_by.push(OrderBy {
                    field: "id".to_string(),
                    order,
                });
            }
        }

        Ok(Self {
            filters: options.filters.clone(),
            order_by,
            window: options.pagination.map(|p| PageWindow::from(p.sanitize())),
        })
    }

    /// True when some filter can never match, so the store need not be asked.
    pub fn is_unsatisfiable(&self) -> bool {
        self.filters.iter().any(|f| f.matcher.is_empty())
    }
}

/// Check that a name is a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_field(field: &str) -> Result<(), RepositoryError> {
    if is_identifier(field) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidQuery(format!(
            "invalid field name '{field}'"
        )))
    }
}

fn validate_filters(filters: &[Filter]) -> Result<(), RepositoryError> {
    filters.iter().try_for_each(|f| validate_field(&f.field))
}

fn validate_order(order_by: &[OrderBy]) -> Result<(), RepositoryError> {
    order_by.iter().try_for_each(|o| validate_field(&o.field))
}
