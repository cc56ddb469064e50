use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{fingerprint, CacheStats, ResultCache};
use crate::catalog::{Catalog, CatalogMetadata};
use crate::config::EngineConfig;
use crate::error::{Result, ValidationError};
use crate::executor::{QueryResult, Row, SqlExecutor};
use crate::models::QueryRequest;
use crate::query_builder::{CompiledQuery, CompiledStatement, SqlBuilder};
use crate::validation::Validator;

/// Orchestrates the pipeline: validate, check the cache, compile, execute,
/// store. The catalog and the executor are injected; the engine owns the
/// cache and the compiler.
pub struct QueryEngine {
    validator: Validator,
    builder: SqlBuilder,
    cache: ResultCache,
    cache_enabled: bool,
    preview_limit: u32,
    catalog: Arc<Catalog>,
    executor: Arc<dyn SqlExecutor>,
}

impl QueryEngine {
    pub fn new(catalog: Arc<Catalog>, executor: Arc<dyn SqlExecutor>) -> Self {
        Self::with_config(catalog, executor, &EngineConfig::default())
    }

    pub fn with_config(
        catalog: Arc<Catalog>,
        executor: Arc<dyn SqlExecutor>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            validator: Validator::new(catalog.clone()),
            builder: SqlBuilder::new(catalog.clone()),
            cache: ResultCache::with_config(
                config.cache.max_entries,
                Duration::from_secs(config.cache.ttl_secs),
            ),
            cache_enabled: config.cache.enabled,
            preview_limit: config.query.preview_limit,
            catalog,
            executor,
        }
    }

    pub fn validate(&self, request: &QueryRequest) -> std::result::Result<(), ValidationError> {
        self.validator.validate(request)
    }

    /// Validates and compiles without executing. Useful for inspecting the
    /// SQL a request produces.
    pub fn compile(&self, request: &QueryRequest) -> Result<CompiledQuery> {
        self.validator.validate(request)?;
        self.builder.build(request)
    }

    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryResult> {
        self.validator.validate(request)?;

        let key = if self.cache_enabled {
            let key = fingerprint(request)?;
            if let Some(mut cached) = self.cache.get(&key) {
                tracing::debug!(key = %key, "cache hit");
                cached.from_cache = true;
                return Ok(cached);
            }
            Some(key)
        } else {
            None
        };

        let compiled = self.builder.build(request)?;
        let start = Instant::now();
        let rows = self.run_statement(&compiled.primary).await?;
        let comparison_rows = match &compiled.comparison {
            Some(statement) => Some(self.run_statement(statement).await?),
            None => None,
        };
        let execution_ms = start.elapsed().as_millis() as u64;

        let result = QueryResult {
            row_count: rows.len(),
            rows,
            execution_ms,
            from_cache: false,
            comparison_rows,
        };
        tracing::info!(
            rows = result.row_count,
            ms = execution_ms,
            comparison = result.comparison_rows.is_some(),
            "query executed"
        );

        if let Some(key) = key {
            self.cache.put(key, result.clone());
        }
        Ok(result)
    }

    /// Runs the request with a small forced window for result sampling.
    /// The limit and offset overrides make previews cheap regardless of what
    /// the request asks for.
    pub async fn preview(&self, request: &QueryRequest) -> Result<QueryResult> {
        let mut preview_request = request.clone();
        preview_request.limit = Some(self.preview_limit);
        preview_request.offset = Some(0);
        self.execute(&preview_request).await
    }

    pub fn metadata(&self) -> CatalogMetadata {
        self.catalog.metadata()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    async fn run_statement(&self, statement: &CompiledStatement) -> Result<Vec<Row>> {
        match self
            .executor
            .execute(&statement.sql, &statement.params)
            .await
        {
            Ok(rows) => Ok(rows),
            Err(e) => {
                // keep the generated SQL next to the failure for diagnosis;
                // the caller only sees the opaque execution error
                tracing::error!(error = %e, sql = %statement.sql, "statement failed");
                Err(e)
            }
        }
    }
}
