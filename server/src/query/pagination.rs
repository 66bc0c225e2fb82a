//! Pagination normalization
//!
//! `firstResult` defaults to 0, `maxResults` to `i32::MAX`. When neither is
//! supplied the query runs unpaged. No upper bound is enforced here and
//! negative values pass through uninterpreted; the engine decides what they
//! mean.

/// Resolved pagination window for the terminal query call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Neither parameter supplied: terminal `list()`.
    All,
    /// At least one parameter supplied: terminal `list_page(first, max)`.
    Page { first: i32, max: i32 },
}

pub fn resolve(first_result: Option<i32>, max_results: Option<i32>) -> Window {
    match (first_result, max_results) {
        (None, None) => Window::All,
        (first, max) => Window::Page {
            first: first.unwrap_or(0),
            max: max.unwrap_or(i32::MAX),
        },
    }
}
