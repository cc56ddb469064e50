use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::ValidationError;
use crate::models::QueryRequest;

pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 10_000;

/// Checks a request against the catalog before any SQL is built.
/// Rules run in a fixed order and the first failure wins.
pub struct Validator {
    catalog: Arc<Catalog>,
}

impl Validator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, request: &QueryRequest) -> Result<(), ValidationError> {
        if request.metrics.is_empty() {
            return Err(ValidationError::NoMetricsSelected);
        }

        for metric_id in &request.metrics {
            if self.catalog.get_metric(metric_id).is_none() {
                return Err(ValidationError::UnknownMetric(metric_id.clone()));
            }
        }

        for dimension_id in &request.dimensions {
            let dimension = self
                .catalog
                .get_dimension(dimension_id)
                .ok_or_else(|| ValidationError::UnknownDimension(dimension_id.clone()))?;
            if !dimension.groupable {
                return Err(ValidationError::DimensionNotGroupable(dimension_id.clone()));
            }
        }

        if let Some(limit) = request.limit {
            if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
                return Err(ValidationError::LimitOutOfRange(limit));
            }
        }

        Ok(())
    }
}
