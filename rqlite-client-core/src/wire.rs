//! Wire shapes returned by the rqlite HTTP API.

use serde::Deserialize;
use serde_json::Value;

/// One element of the `results` array in a `/db/query` or `/db/execute`
/// response.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawResultItem {
    #[serde(default)]
    pub values: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    pub last_insert_id: Option<i64>,
    #[serde(default)]
    pub rows_affected: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The top-level response envelope for `/db/query` and `/db/execute`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<RawResultItem>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueryResponse {
    /// A successful 200 response with `error == "stale read"`.
    pub fn is_stale_read(&self) -> bool {
        self.error.as_deref() == Some("stale read")
    }
}
