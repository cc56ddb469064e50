pub mod backends;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod query_builder;
pub mod runtime;
pub mod validation;

/// Install a global tracing subscriber driven by `RUST_LOG`. Safe to call
/// more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

pub use cache::{fingerprint, CacheStats, ResultCache};
pub use catalog::{
    Catalog, CatalogMetadata, Dimension, DimensionKind, JoinTable, Metric, SourceExpression,
    ValueFormat,
};
pub use config::EngineConfig;
pub use error::{CompilationError, EngineError, Result, ValidationError};
pub use executor::{QueryResult, Row, SqlExecutor};
pub use models::{Comparison, ComparisonKind, Filter, FilterOperator, FilterValue, QueryRequest};
pub use query_builder::{CompiledQuery, CompiledStatement, SqlBuilder};
pub use runtime::QueryEngine;
pub use validation::Validator;

#[cfg(feature = "postgres")]
pub use backends::PostgresExecutor;
