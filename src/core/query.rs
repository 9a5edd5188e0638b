//! Query parameters, document queries and pagination utilities

use crate::config::PaginationConfig;
use crate::core::entity::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pagination and sorting parameters shared by every list endpoint
///
/// # Example
/// ```text
/// GET /manifest?page=2&limit=10
/// GET /drs?status=Delivered&sortBy=created_at&sortOrder=desc
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ListParams {
    /// Page number (starts at 1)
    pub page: Option<usize>,

    /// Number of items per page
    pub limit: Option<usize>,

    /// Field to sort on
    pub sort_by: Option<String>,

    /// `asc` (default) or `desc`
    pub sort_order: Option<String>,
}

impl ListParams {
    /// Get page number, ensuring minimum of 1
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    /// Get limit, falling back to the configured default and capped at the maximum
    pub fn limit(&self, config: &PaginationConfig) -> usize {
        self.limit
            .unwrap_or(config.default_limit)
            .clamp(1, config.max_limit)
    }

    pub fn sort(&self) -> Option<Sort> {
        self.sort_by.as_ref().map(|field| Sort {
            field: field.clone(),
            order: match self.sort_order.as_deref() {
                Some("desc") | Some("DESC") | Some("-1") => SortOrder::Desc,
                _ => SortOrder::Asc,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// One filter condition on a dotted field path
///
/// Paths traverse arrays: `groups.items.item_id` matches when any item of
/// any group carries the value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value
    Eq { field: String, value: Value },
    /// Field equals one of the values
    In { field: String, values: Vec<Value> },
    /// Case-insensitive substring match on a string field
    Contains { field: String, needle: String },
    /// Field is greater than or equal to value
    Gte { field: String, value: Value },
    /// Field is less than or equal to value
    Lte { field: String, value: Value },
}

impl Condition {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Condition::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Condition::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        }
    }

    /// Timestamp field at or after `at`, compared in the stored format
    pub fn since(field: &str, at: &DateTime<Utc>) -> Self {
        Condition::Gte {
            field: field.to_string(),
            value: Value::String(timestamp::format(at)),
        }
    }

    /// Timestamp field at or before `at`
    pub fn until(field: &str, at: &DateTime<Utc>) -> Self {
        Condition::Lte {
            field: field.to_string(),
            value: Value::String(timestamp::format(at)),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Condition::Eq { field, .. }
            | Condition::In { field, .. }
            | Condition::Contains { field, .. }
            | Condition::Gte { field, .. }
            | Condition::Lte { field, .. } => field,
        }
    }
}

/// A backend-neutral query: conditions (ANDed), sort, and a page window
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub conditions: Vec<Condition>,
    pub sort: Option<Sort>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn filters(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    pub fn sort(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn paginate(mut self, page: usize, limit: usize) -> Self {
        self.skip = (page.max(1) - 1) * limit;
        self.limit = Some(limit);
        self
    }
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items (after filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1) * limit;

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start + limit < total,
            has_prev: page > 1,
        }
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: usize, limit: usize, total: usize) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(page, limit, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
