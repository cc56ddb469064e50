use crate::catalog::Catalog;
use crate::error::CompilationError;
use crate::models::{Filter, FilterOperator, FilterValue, LogicalOperator};

/// Renders the WHERE body, appending bound values to `params` in placeholder
/// order. A filter's `logical_operator` connects it to the *next* condition;
/// the last one's is ignored and missing ones default to AND.
pub(crate) fn render_where(
    catalog: &Catalog,
    filters: &[Filter],
    params: &mut Vec<FilterValue>,
) -> Result<Option<String>, CompilationError> {
    if filters.is_empty() {
        return Ok(None);
    }

    let mut clause = String::new();
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            let connector = filters[i - 1]
                .logical_operator
                .unwrap_or(LogicalOperator::And);
            clause.push(' ');
            clause.push_str(connector.as_sql());
            clause.push(' ');
        }
        let expr = resolve_field(catalog, &filter.field)?;
        clause.push_str(&render_condition(&expr, filter, params)?);
    }
    Ok(Some(clause))
}

/// A filter field is either a catalog dimension (its SQL expression is used)
/// or a plain column on the base table.
fn resolve_field(catalog: &Catalog, field: &str) -> Result<String, CompilationError> {
    if let Some(dimension) = catalog.get_dimension(field) {
        if !dimension.filterable {
            return Err(CompilationError::InvalidFilterField(field.to_string()));
        }
        return Ok(dimension.expression.to_sql());
    }
    if !is_identifier(field) {
        return Err(CompilationError::InvalidFilterField(field.to_string()));
    }
    Ok(format!("s.{field}"))
}

fn is_identifier(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn render_condition(
    expr: &str,
    filter: &Filter,
    params: &mut Vec<FilterValue>,
) -> Result<String, CompilationError> {
    match filter.operator {
        FilterOperator::Eq if filter.value.is_null() => Ok(format!("{expr} IS NULL")),
        FilterOperator::Neq if filter.value.is_null() => Ok(format!("{expr} IS NOT NULL")),
        FilterOperator::In | FilterOperator::NotIn => {
            let elements = filter.value.elements();
            if elements.is_empty() {
                // IN () is not valid SQL; an empty list matches nothing.
                return Ok(match filter.operator {
                    FilterOperator::In => "FALSE".to_string(),
                    _ => "TRUE".to_string(),
                });
            }
            let placeholders: Vec<String> =
                elements.into_iter().map(|v| push_param(params, v)).collect();
            let keyword = match filter.operator {
                FilterOperator::In => "IN",
                _ => "NOT IN",
            };
            Ok(format!("{expr} {keyword} ({})", placeholders.join(", ")))
        }
        FilterOperator::Between => {
            let elements = filter.value.elements();
            if elements.len() != 2 {
                return Err(CompilationError::InvalidBetweenValues(
                    filter.value.to_string(),
                ));
            }
            let mut it = elements.into_iter();
            let low = push_param(params, it.next().unwrap());
            let high = push_param(params, it.next().unwrap());
            Ok(format!("{expr} BETWEEN {low} AND {high}"))
        }
        FilterOperator::Like => {
            let pattern = format!("%{}%", raw_text(&filter.value));
            let placeholder = push_param(params, FilterValue::String(pattern));
            Ok(format!("{expr} LIKE {placeholder}"))
        }
        op => {
            let placeholder = push_param(params, filter.value.clone());
            Ok(format!("{expr} {} {placeholder}", comparison_sql(op)))
        }
    }
}

fn push_param(params: &mut Vec<FilterValue>, value: FilterValue) -> String {
    params.push(value);
    format!("${}", params.len())
}

fn comparison_sql(op: FilterOperator) -> &'static str {
    match op {
        FilterOperator::Eq => "=",
        FilterOperator::Neq => "!=",
        FilterOperator::Gt => ">",
        FilterOperator::Lt => "<",
        FilterOperator::Gte => ">=",
        FilterOperator::Lte => "<=",
        _ => unreachable!("handled above"),
    }
}

fn raw_text(value: &FilterValue) -> String {
    match value {
        FilterValue::String(s) => s.clone(),
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Bool(b) => b.to_string(),
        FilterValue::Null => String::new(),
        FilterValue::List(items) => items
            .iter()
            .map(raw_text)
            .collect::<Vec<_>>()
            .join(","),
    }
}
