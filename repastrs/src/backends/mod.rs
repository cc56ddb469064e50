//! Database backends, each gated behind a feature flag.

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresExecutor;
