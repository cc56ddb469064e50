//! Integration tests for the query builder.
//!
//! These tests exercise the public API: SqlBuilder, Catalog, QueryRequest.

use std::collections::BTreeSet;
use std::sync::Arc;

use repast::models::{
    Comparison, ComparisonKind, Filter, FilterOperator, FilterValue, LogicalOperator, OrderItem,
    SortDirection,
};
use repast::{Catalog, JoinTable, QueryRequest, SqlBuilder};

fn builder() -> SqlBuilder {
    SqlBuilder::new(Arc::new(Catalog::builtin().clone()))
}

fn filter(field: &str, operator: FilterOperator, value: FilterValue) -> Filter {
    Filter {
        field: field.to_string(),
        operator,
        value,
        logical_operator: None,
    }
}

fn base_request() -> QueryRequest {
    QueryRequest {
        metrics: vec!["total_sales".to_string(), "order_count".to_string()],
        dimensions: vec!["channel".to_string()],
        ..Default::default()
    }
}

#[test]
fn full_statement_for_grouped_query() {
    let compiled = builder().build(&base_request()).unwrap();
    assert_eq!(
        compiled.primary.sql,
        "SELECT channels.name AS \"channel\", SUM(s.total_amount) AS \"total_sales\", \
         COUNT(s.id) AS \"order_count\" FROM sales s \
         LEFT JOIN channels ON channels.id = s.channel_id \
         GROUP BY 1 ORDER BY 1 ASC"
    );
    assert!(compiled.comparison.is_none());
}

#[test]
fn payment_dimension_joins_through_payments() {
    let mut request = base_request();
    request.dimensions = vec!["payment_type".to_string()];
    let compiled = builder().build(&request).unwrap();
    assert!(compiled
        .primary
        .sql
        .contains("LEFT JOIN payments ON payments.sale_id = s.id"));
    assert!(compiled
        .primary
        .sql
        .contains("LEFT JOIN payment_types ON payment_types.id = payments.payment_type_id"));
    let payments = compiled.primary.sql.find("JOIN payments ").unwrap();
    let payment_types = compiled.primary.sql.find("JOIN payment_types").unwrap();
    assert!(payments < payment_types);
}

#[test]
fn or_chain_between_filters() {
    let mut request = base_request();
    let mut completed = filter(
        "sale_status",
        FilterOperator::Eq,
        FilterValue::String("COMPLETED".to_string()),
    );
    completed.logical_operator = Some(LogicalOperator::Or);
    let pending = filter(
        "sale_status",
        FilterOperator::Eq,
        FilterValue::String("PENDING".to_string()),
    );
    request.filters = vec![completed, pending];

    let compiled = builder().build(&request).unwrap();
    assert!(compiled
        .primary
        .sql
        .contains("WHERE s.sale_status_desc = $1 OR s.sale_status_desc = $2"));
    assert_eq!(compiled.primary.params.len(), 2);
}

#[test]
fn order_by_metric_descending() {
    let mut request = base_request();
    request.order_by = vec![OrderItem {
        field: "total_sales".to_string(),
        direction: SortDirection::Desc,
    }];
    request.limit = Some(5);
    let compiled = builder().build(&request).unwrap();
    assert!(compiled
        .primary
        .sql
        .ends_with("ORDER BY \"total_sales\" DESC LIMIT 5"));
}

#[test]
fn comparison_produces_second_statement_with_shifted_window() {
    let mut request = base_request();
    request.filters = vec![filter(
        "date_day",
        FilterOperator::Between,
        FilterValue::List(vec![
            FilterValue::String("2024-03-01".to_string()),
            FilterValue::String("2024-03-31".to_string()),
        ]),
    )];
    request.comparison = Some(Comparison {
        enabled: true,
        kind: ComparisonKind::PreviousPeriod,
        custom_start: None,
        custom_end: None,
        date_field: None,
    });

    let compiled = builder().build(&request).unwrap();
    let comparison = compiled.comparison.expect("comparison statement");
    // Same shape, different bound window.
    assert_eq!(compiled.primary.sql, comparison.sql);
    assert_eq!(
        compiled.primary.params,
        vec![
            FilterValue::String("2024-03-01".to_string()),
            FilterValue::String("2024-03-31".to_string()),
        ]
    );
    assert_eq!(
        comparison.params,
        vec![
            FilterValue::String("2024-01-30".to_string()),
            FilterValue::String("2024-02-29".to_string()),
        ]
    );
}

#[test]
fn compiled_query_reports_its_join_set() {
    let mut request = base_request();
    request.dimensions = vec!["product_category".to_string()];
    let compiled = builder().build(&request).unwrap();
    assert_eq!(
        compiled.joins,
        BTreeSet::from([
            JoinTable::ProductSales,
            JoinTable::Products,
            JoinTable::Categories
        ])
    );
    for table in &compiled.joins {
        assert!(compiled.primary.sql.contains(table.join_clause()));
    }
}

#[test]
fn dimension_filter_without_grouping_still_joins() {
    let request = QueryRequest {
        metrics: vec!["total_sales".to_string()],
        filters: vec![filter(
            "store",
            FilterOperator::Eq,
            FilterValue::String("Downtown".to_string()),
        )],
        ..Default::default()
    };
    let compiled = builder().build(&request).unwrap();
    assert!(compiled
        .primary
        .sql
        .contains("LEFT JOIN stores ON stores.id = s.store_id"));
    assert!(compiled.primary.sql.contains("WHERE stores.name = $1"));
    assert!(!compiled.primary.sql.contains("GROUP BY"));
}

#[test]
fn request_parsed_from_json_compiles() {
    let request: QueryRequest = serde_json::from_str(
        r#"{
            "metrics": ["avg_ticket"],
            "dimensions": ["date_month"],
            "filters": [
                {"field": "channel", "operator": "=", "value": "iFood"}
            ],
            "limit": 12
        }"#,
    )
    .unwrap();
    let compiled = builder().build(&request).unwrap();
    assert_eq!(
        compiled.primary.sql,
        "SELECT DATE_TRUNC('month', s.created_at) AS \"date_month\", \
         AVG(s.total_amount) AS \"avg_ticket\" FROM sales s \
         LEFT JOIN channels ON channels.id = s.channel_id \
         WHERE channels.name = $1 GROUP BY 1 ORDER BY 1 ASC LIMIT 12"
    );
}
