//! Domain types shared by every repository.

pub mod entity;
pub mod pagination;

pub use entity::{Entity, EntityId, EntityMeta, RESERVED_FIELDS, UPDATED_AT_FIELD};
pub use pagination::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageWindow, Pagination, PaginationParams, SortOrder,
    sanitize_pagination,
};
