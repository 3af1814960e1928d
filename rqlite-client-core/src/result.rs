//! Result adapters.

use serde_json::Value;

use crate::wire::RawResultItem;

/// A renamed, zero-copy view over a [`RawResultItem`]: `values` becomes
/// `results`, `last_insert_id`/`rows_affected`/`error` keep their names.
/// Borrows rather than clones the row data.
#[derive(Debug, Clone, Copy)]
pub struct AdaptedResultItem<'a> {
    raw: &'a RawResultItem,
}

impl<'a> AdaptedResultItem<'a> {
    pub fn new(raw: &'a RawResultItem) -> Self {
        Self { raw }
    }

    /// The returned rows, if any (reads were requested).
    pub fn results(&self) -> Option<&'a [Vec<Value>]> {
        self.raw.values.as_deref()
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.raw.last_insert_id
    }

    pub fn rows_affected(&self) -> Option<i64> {
        self.raw.rows_affected
    }

    pub fn error(&self) -> Option<&'a str> {
        self.raw.error.as_deref()
    }
}

/// The outcome of a bulk `executeMany` call.
///
/// `items_raw` is exactly what the server returned — the server may emit
/// fewer items than operations submitted when a SQL error aborts a batch
/// mid-way, and that truncation must be preserved, never padded.
#[derive(Debug, Clone, Default)]
pub struct BulkResult {
    items_raw: Vec<RawResultItem>,
}

impl BulkResult {
    pub fn new(items_raw: Vec<RawResultItem>) -> Self {
        Self { items_raw }
    }

    pub fn items_raw(&self) -> &[RawResultItem] {
        &self.items_raw
    }

    /// The lazily materialized, zero-copy adapted view over each item.
    pub fn items(&self) -> Vec<AdaptedResultItem<'_>> {
        self.items_raw.iter().map(AdaptedResultItem::new).collect()
    }

    /// Number of items returned; `<=` the number of operations submitted.
    pub fn len(&self) -> usize {
        self.items_raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items_raw.is_empty()
    }

    /// The 0-based index of the first item carrying a non-empty `error`,
    /// if any.
    pub fn first_error_index(&self) -> Option<usize> {
        self.items_raw
            .iter()
            .position(|item| item.error.as_deref().is_some_and(|e| !e.is_empty()))
    }
}
