//! Pagination bounds for history queries.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIMIT: u64 = 20;

/// Largest page size a caller may request.
pub const MAX_LIMIT: u64 = 1000;

/// Limit/offset window applied to an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of items to return, within `1..=MAX_LIMIT`.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Number of items to skip before the first returned one.
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PageRequest {
    /// Builds a window from optional caller input.
    ///
    /// A missing limit falls back to [`DEFAULT_LIMIT`]; a missing offset is `0`.
    /// Returns `None` if the limit falls outside `1..=MAX_LIMIT`.
    #[must_use]
    pub fn bounded(limit: Option<u64>, offset: Option<u64>) -> Option<Self> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return None;
        }

        Some(Self {
            limit,
            offset: offset.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_default() {
        let request = PageRequest::default();
        assert_eq!(request.limit, 20);
        assert_eq!(request.offset, 0);
    }

    #[test]
    fn test_bounded_defaults() {
        assert_eq!(PageRequest::bounded(None, None), Some(PageRequest::default()));
    }

    #[test]
    fn test_bounded_keeps_caller_values() {
        let request = PageRequest::bounded(Some(5), Some(40)).unwrap();
        assert_eq!(request.limit, 5);
        assert_eq!(request.offset, 40);
    }

    #[test]
    fn test_bounded_limit_range() {
        assert!(PageRequest::bounded(Some(0), None).is_none());
        assert!(PageRequest::bounded(Some(1), None).is_some());
        assert!(PageRequest::bounded(Some(MAX_LIMIT), None).is_some());
        assert!(PageRequest::bounded(Some(MAX_LIMIT + 1), None).is_none());
    }
}
