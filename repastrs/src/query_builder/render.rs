use crate::catalog::{Catalog, BASE_TABLE};
use crate::error::{Result, ValidationError};
use crate::models::QueryRequest;
use crate::query_builder::{filters, joins, CompiledStatement};

/// Assembles the final statement. Clause order is fixed:
/// SELECT, FROM, joins, WHERE, GROUP BY, ORDER BY, LIMIT, OFFSET.
pub(crate) fn render_statement(
    catalog: &Catalog,
    request: &QueryRequest,
) -> Result<CompiledStatement> {
    let mut params = Vec::new();
    let mut sql = String::from("SELECT ");
    sql.push_str(&select_list(catalog, request)?);

    sql.push_str(" FROM ");
    sql.push_str(BASE_TABLE);
    for table in joins::required_joins(catalog, request) {
        sql.push(' ');
        sql.push_str(table.join_clause());
    }

    if let Some(clause) = filters::render_where(catalog, &request.filters, &mut params)? {
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }

    if !request.dimensions.is_empty() {
        let positions: Vec<String> = (1..=request.dimensions.len())
            .map(|i| i.to_string())
            .collect();
        sql.push_str(" GROUP BY ");
        sql.push_str(&positions.join(", "));
    }

    if let Some(order) = order_clause(catalog, request) {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }

    if let Some(limit) = request.limit {
        sql.push_str(" LIMIT ");
        sql.push_str(&limit.to_string());
    }

    if let Some(offset) = request.offset.filter(|o| *o > 0) {
        sql.push_str(" OFFSET ");
        sql.push_str(&offset.to_string());
    }

    Ok(CompiledStatement { sql, params })
}

/// Dimensions first, then metrics, each aliased to its catalog id. Output
/// aliases are what order-by references and what result rows are keyed by.
fn select_list(catalog: &Catalog, request: &QueryRequest) -> Result<String> {
    let mut columns = Vec::new();
    for dimension_id in &request.dimensions {
        let dimension = catalog
            .get_dimension(dimension_id)
            .ok_or_else(|| ValidationError::UnknownDimension(dimension_id.clone()))?;
        columns.push(format!(
            "{} AS \"{}\"",
            dimension.expression.to_sql(),
            dimension.id
        ));
    }
    for metric_id in &request.metrics {
        let metric = catalog
            .get_metric(metric_id)
            .ok_or_else(|| ValidationError::UnknownMetric(metric_id.clone()))?;
        columns.push(format!("{} AS \"{}\"", metric.expression, metric.id));
    }
    Ok(columns.join(", "))
}

/// Explicit order items sort by output alias; entries that name nothing in
/// the select list, or a dimension marked unsortable, are dropped. With no
/// usable items, grouped queries default to the first dimension ascending.
fn order_clause(catalog: &Catalog, request: &QueryRequest) -> Option<String> {
    let mut items = Vec::new();
    for item in &request.order_by {
        let selected_dimension = request.dimensions.contains(&item.field);
        let selected_metric = request.metrics.contains(&item.field);
        if !selected_dimension && !selected_metric {
            continue;
        }
        if selected_dimension {
            match catalog.get_dimension(&item.field) {
                Some(d) if d.sortable => {}
                _ => continue,
            }
        }
        items.push(format!("\"{}\" {}", item.field, item.direction.as_sql()));
    }
    if !items.is_empty() {
        return Some(items.join(", "));
    }
    if !request.dimensions.is_empty() {
        return Some("1 ASC".to_string());
    }
    None
}
