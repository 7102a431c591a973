//! Paging request normalization, result envelope and filters.

use crate::error::DataError;
use crate::sql::SqlValue;
use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: i64 = 1000;

/// Page index is 1-based; anything lower is the first page. Size is clamped to `1..=MAX_PAGE_SIZE`.
pub fn normalize_page(page_index: i64, page_size: i64) -> (i64, i64) {
    (page_index.max(1), page_size.clamp(1, MAX_PAGE_SIZE))
}

/// Rows to skip before `page_index`; saturates instead of overflowing on huge indexes.
pub fn page_offset(page_index: i64, page_size: i64) -> i64 {
    page_index.saturating_sub(1).max(0).saturating_mul(page_size)
}

/// Equality filter on one column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "Column", alias = "column")]
    pub column: String,
    #[serde(rename = "Value", alias = "value", default)]
    pub value: SqlValue,
}

impl Filter {
    pub fn new(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Parses `[{"Column": "Status", "Value": "Open"}, ...]`. Blank input means no filter.
    pub fn parse_list(s: &str) -> Result<Vec<Filter>, DataError> {
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(s).map_err(DataError::Decode)
    }

    pub fn list_to_json(filters: &[Filter]) -> String {
        serde_json::to_string(filters).unwrap_or_else(|_| "[]".into())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingResult<T> {
    pub items: Vec<T>,
    pub page_index: i64,
    pub page_size: i64,
    pub keywords: String,
    /// Size of the whole matching set, not of `items`.
    pub total_row: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds() {
        assert_eq!(normalize_page(0, 10), (1, 10));
        assert_eq!(normalize_page(3, 0), (3, 1));
        assert_eq!(normalize_page(1, 5000), (1, MAX_PAGE_SIZE));
        assert_eq!(page_offset(2, 10), 10);
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(i64::MAX, MAX_PAGE_SIZE), i64::MAX);
        assert_eq!(page_offset(i64::MIN, 10), 0);
    }

    #[test]
    fn filter_list_accepts_either_case() {
        let f = Filter::parse_list(r#"[{"Column":"Status","Value":"Open"},{"column":"points","value":3}]"#).unwrap();
        assert_eq!(f, vec![Filter::new("Status", "Open"), Filter::new("points", 3)]);
        assert!(Filter::parse_list("  ").unwrap().is_empty());
        assert!(Filter::parse_list("not json").is_err());
    }
}
