//! Catalog loading and metadata tests.

use std::fs;

use repast::{Catalog, DimensionKind, JoinTable, SourceExpression, ValueFormat};

#[test]
fn loads_catalog_from_yaml_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("metrics")).unwrap();
    fs::create_dir(dir.path().join("dimensions")).unwrap();

    fs::write(
        dir.path().join("metrics/tip_total.yml"),
        r#"
id: tip_total
name: Tips
description: Total tips received
expression: SUM(s.tip_amount)
format: currency
category: Financial
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("dimensions/waiter.yaml"),
        r#"
id: waiter
name: Waiter
description: Waiter who served the order
kind: entity
expression: s.waiter_name
sortable: false
"#,
    )
    .unwrap();

    let catalog = Catalog::load_from_dir(dir.path()).unwrap();
    let metric = catalog.get_metric("tip_total").unwrap();
    assert_eq!(metric.format, ValueFormat::Currency);
    assert!(metric.required_joins.is_empty());

    let dimension = catalog.get_dimension("waiter").unwrap();
    assert_eq!(dimension.kind, DimensionKind::Entity);
    assert!(dimension.groupable);
    assert!(!dimension.sortable);
}

#[test]
fn missing_directories_are_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::load_from_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("metrics directory not found"));
}

#[test]
fn required_joins_roundtrip_through_yaml() {
    let yaml = r#"
id: top_category
name: Top Category
description: Category of the product sold
kind: entity
expression:
  table: categories
  field: name
required_joins: [product_sales, products, categories]
"#;
    let dimension: repast::Dimension = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        dimension.expression,
        SourceExpression::column("categories", "name")
    );
    assert_eq!(
        dimension.required_joins,
        vec![
            JoinTable::ProductSales,
            JoinTable::Products,
            JoinTable::Categories
        ]
    );
}

#[test]
fn metadata_lists_every_entry_sorted_by_id() {
    let metadata = Catalog::builtin().metadata();
    assert_eq!(metadata.metrics.len(), 18);
    assert_eq!(metadata.dimensions.len(), 18);
    let ids: Vec<&str> = metadata.metrics.iter().map(|m| m.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(
        metadata.categories,
        vec!["Customer", "Financial", "Operational", "Product", "Sales"]
    );
}

#[test]
fn groupable_dimensions_excludes_nothing_by_default() {
    let catalog = Catalog::builtin();
    // every built-in dimension is groupable, including the unsortable one
    assert_eq!(catalog.groupable_dimensions().len(), 18);
}
