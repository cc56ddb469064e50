use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::FilterValue;

/// One result row, keyed by the output aliases of the SELECT list.
pub type Row = Map<String, Value>;

/// Executes a compiled statement against a database. Implementations bind
/// `params` positionally to the `$n` placeholders in `sql`.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[FilterValue]) -> Result<Vec<Row>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_ms: u64,
    pub from_cache: bool,
    /// Rows of the shifted-window statement when a comparison was requested.
    pub comparison_rows: Option<Vec<Row>>,
}
