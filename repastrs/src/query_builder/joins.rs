use std::collections::BTreeSet;

use crate::catalog::{Catalog, JoinTable};
use crate::models::QueryRequest;

/// Union of the tables required by the request's metrics, dimensions and
/// dimension-backed filters. The set iterates in declaration order of
/// [`JoinTable`], which keeps every clause's alias dependencies ahead of it
/// (product_sales before products, products before categories).
pub(crate) fn required_joins(catalog: &Catalog, request: &QueryRequest) -> BTreeSet<JoinTable> {
    let mut needed: BTreeSet<JoinTable> = BTreeSet::new();

    for metric_id in &request.metrics {
        if let Some(metric) = catalog.get_metric(metric_id) {
            needed.extend(metric.required_joins.iter().copied());
        }
    }
    for dimension_id in &request.dimensions {
        if let Some(dimension) = catalog.get_dimension(dimension_id) {
            needed.extend(dimension.required_joins.iter().copied());
        }
    }
    for filter in &request.filters {
        if let Some(dimension) = catalog.get_dimension(&filter.field) {
            needed.extend(dimension.required_joins.iter().copied());
        }
    }

    needed
}
