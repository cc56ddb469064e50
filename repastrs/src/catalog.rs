use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use once_cell::sync::Lazy;
use serde::{de, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Base relation every query selects from.
pub const BASE_TABLE: &str = "sales s";

/// Closed set of relations reachable from `sales`. Declaration order is
/// dependency order: a variant's join clause may reference aliases
/// introduced by earlier variants (products needs product_sales, and so on).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JoinTable {
    Channels,
    Stores,
    ProductSales,
    Products,
    Categories,
    Payments,
    PaymentTypes,
    DeliveryAddresses,
}

impl JoinTable {
    pub const ALL: [JoinTable; 8] = [
        JoinTable::Channels,
        JoinTable::Stores,
        JoinTable::ProductSales,
        JoinTable::Products,
        JoinTable::Categories,
        JoinTable::Payments,
        JoinTable::PaymentTypes,
        JoinTable::DeliveryAddresses,
    ];

    pub fn join_clause(&self) -> &'static str {
        match self {
            JoinTable::Channels => "LEFT JOIN channels ON channels.id = s.channel_id",
            JoinTable::Stores => "LEFT JOIN stores ON stores.id = s.store_id",
            JoinTable::ProductSales => "LEFT JOIN product_sales ps ON ps.sale_id = s.id",
            JoinTable::Products => "LEFT JOIN products ON products.id = ps.product_id",
            JoinTable::Categories => {
                "LEFT JOIN categories ON categories.id = products.category_id"
            }
            JoinTable::Payments => "LEFT JOIN payments ON payments.sale_id = s.id",
            JoinTable::PaymentTypes => {
                "LEFT JOIN payment_types ON payment_types.id = payments.payment_type_id"
            }
            JoinTable::DeliveryAddresses => {
                "LEFT JOIN delivery_addresses ON delivery_addresses.sale_id = s.id"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Currency,
    Number,
    Percentage,
    Duration,
}

/// An aggregate the engine knows how to compute. `expression` is a complete
/// SQL aggregate over the base alias `s` (and `ps` when product_sales is
/// among `required_joins`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub name: String,
    pub description: String,
    pub expression: String,
    pub format: ValueFormat,
    pub category: String,
    #[serde(default)]
    pub required_joins: Vec<JoinTable>,
}

/// What a dimension represents, for grouping UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Entity,
    Temporal,
    Categorical,
    Geographical,
}

/// Where a dimension's value comes from: a column on a joined table, or a
/// raw SQL fragment over the base alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SourceExpression {
    Column { table: String, field: String },
    Sql(String),
}

impl SourceExpression {
    pub fn column(table: &str, field: &str) -> Self {
        SourceExpression::Column {
            table: table.to_string(),
            field: field.to_string(),
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            SourceExpression::Column { table, field } => format!("{table}.{field}"),
            SourceExpression::Sql(sql) => sql.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for SourceExpression {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(SourceExpression::Sql(s)),
            other => {
                #[derive(Deserialize)]
                struct Full {
                    table: String,
                    field: String,
                }
                let full = Full::deserialize(other).map_err(de::Error::custom)?;
                Ok(SourceExpression::Column {
                    table: full.table,
                    field: full.field,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: DimensionKind,
    pub expression: SourceExpression,
    #[serde(default)]
    pub required_joins: Vec<JoinTable>,
    #[serde(default = "default_true")]
    pub groupable: bool,
    #[serde(default = "default_true")]
    pub filterable: bool,
    #[serde(default = "default_true")]
    pub sortable: bool,
}

fn default_true() -> bool {
    true
}

/// What the engine exposes to clients building report UIs.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogMetadata {
    pub metrics: Vec<Metric>,
    pub dimensions: Vec<Dimension>,
    /// Distinct metric categories, sorted.
    pub categories: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub metrics: BTreeMap<String, Metric>,
    pub dimensions: BTreeMap<String, Dimension>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(metrics: Vec<Metric>, dimensions: Vec<Dimension>) -> Self {
        let mut catalog = Catalog::new();
        for metric in metrics {
            catalog.metrics.insert(metric.id.clone(), metric);
        }
        for dimension in dimensions {
            catalog.dimensions.insert(dimension.id.clone(), dimension);
        }
        catalog
    }

    /// Loads YAML definitions from `<root>/metrics` and `<root>/dimensions`.
    /// Each file holds one entry.
    pub fn load_from_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        let mut catalog = Catalog::new();
        catalog.load_metrics(root.as_ref().join("metrics"))?;
        catalog.load_dimensions(root.as_ref().join("dimensions"))?;
        Ok(catalog)
    }

    fn load_metrics(&mut self, dir: PathBuf) -> Result<()> {
        if !dir.exists() {
            return Err(EngineError::Catalog(format!(
                "metrics directory not found: {}",
                dir.display()
            )));
        }
        for entry in yaml_files(&dir)? {
            let contents = fs::read_to_string(&entry)?;
            let metric: Metric = serde_yaml::from_str(&contents)?;
            self.metrics.insert(metric.id.clone(), metric);
        }
        Ok(())
    }

    fn load_dimensions(&mut self, dir: PathBuf) -> Result<()> {
        if !dir.exists() {
            return Err(EngineError::Catalog(format!(
                "dimensions directory not found: {}",
                dir.display()
            )));
        }
        for entry in yaml_files(&dir)? {
            let contents = fs::read_to_string(&entry)?;
            let dimension: Dimension = serde_yaml::from_str(&contents)?;
            self.dimensions.insert(dimension.id.clone(), dimension);
        }
        Ok(())
    }

    pub fn get_metric(&self, id: &str) -> Option<&Metric> {
        self.metrics.get(id)
    }

    pub fn get_dimension(&self, id: &str) -> Option<&Dimension> {
        self.dimensions.get(id)
    }

    pub fn groupable_dimensions(&self) -> Vec<&Dimension> {
        self.dimensions.values().filter(|d| d.groupable).collect()
    }

    pub fn metadata(&self) -> CatalogMetadata {
        let categories: std::collections::BTreeSet<String> =
            self.metrics.values().map(|m| m.category.clone()).collect();
        CatalogMetadata {
            metrics: self.metrics.values().cloned().collect(),
            dimensions: self.dimensions.values().cloned().collect(),
            categories: categories.into_iter().collect(),
        }
    }

    /// The built-in restaurant-sales catalog.
    pub fn builtin() -> &'static Catalog {
        static BUILTIN: Lazy<Catalog> = Lazy::new(builtin_catalog);
        &BUILTIN
    }
}

fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in ["yml", "yaml"] {
        for entry in glob(&format!("{}/*.{}", dir.display(), pattern))
            .map_err(|e| EngineError::Other(e.into()))?
            .flatten()
        {
            files.push(entry);
        }
    }
    Ok(files)
}

fn metric(
    id: &str,
    name: &str,
    description: &str,
    expression: &str,
    format: ValueFormat,
    category: &str,
    required_joins: &[JoinTable],
) -> Metric {
    Metric {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        expression: expression.to_string(),
        format,
        category: category.to_string(),
        required_joins: required_joins.to_vec(),
    }
}

fn dimension(
    id: &str,
    name: &str,
    description: &str,
    kind: DimensionKind,
    expression: SourceExpression,
    required_joins: &[JoinTable],
) -> Dimension {
    Dimension {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        kind,
        expression,
        required_joins: required_joins.to_vec(),
        groupable: true,
        filterable: true,
        sortable: true,
    }
}

fn builtin_catalog() -> Catalog {
    use JoinTable::*;

    let metrics = vec![
        metric(
            "total_sales",
            "Total Sales",
            "Gross revenue over completed orders",
            "SUM(s.total_amount)",
            ValueFormat::Currency,
            "Sales",
            &[],
        ),
        metric(
            "total_sales_net",
            "Net Sales",
            "Revenue after discounts",
            "SUM(s.total_amount - s.total_discount)",
            ValueFormat::Currency,
            "Sales",
            &[],
        ),
        metric(
            "order_count",
            "Order Count",
            "Number of orders",
            "COUNT(s.id)",
            ValueFormat::Number,
            "Sales",
            &[],
        ),
        metric(
            "avg_ticket",
            "Average Ticket",
            "Average order value",
            "AVG(s.total_amount)",
            ValueFormat::Currency,
            "Sales",
            &[],
        ),
        metric(
            "total_items_sold",
            "Items Sold",
            "Total product units sold",
            "SUM(ps.quantity)",
            ValueFormat::Number,
            "Sales",
            &[ProductSales],
        ),
        metric(
            "avg_items_per_order",
            "Avg Items per Order",
            "Average units per order line",
            "AVG(ps.quantity)",
            ValueFormat::Number,
            "Sales",
            &[ProductSales],
        ),
        metric(
            "total_discount",
            "Total Discount",
            "Sum of discounts granted",
            "SUM(s.total_discount)",
            ValueFormat::Currency,
            "Financial",
            &[],
        ),
        metric(
            "discount_rate",
            "Discount Rate",
            "Discounts as a share of gross value",
            "(SUM(s.total_discount) * 100.0 / NULLIF(SUM(s.total_amount + s.total_discount), 0))",
            ValueFormat::Percentage,
            "Financial",
            &[],
        ),
        metric(
            "total_delivery_fee",
            "Delivery Fees",
            "Sum of delivery fees charged",
            "SUM(s.delivery_fee)",
            ValueFormat::Currency,
            "Financial",
            &[],
        ),
        metric(
            "total_service_fee",
            "Service Fees",
            "Sum of service taxes charged",
            "SUM(s.service_tax_fee)",
            ValueFormat::Currency,
            "Financial",
            &[],
        ),
        metric(
            "avg_profit_margin",
            "Avg Profit Margin",
            "Average margin after discounts",
            "AVG(((s.total_amount - COALESCE(s.total_discount, 0)) * 100.0) / NULLIF(s.total_amount, 0))",
            ValueFormat::Percentage,
            "Financial",
            &[],
        ),
        metric(
            "avg_production_time",
            "Avg Production Time",
            "Average kitchen time in minutes",
            "AVG(s.production_seconds / 60.0)",
            ValueFormat::Duration,
            "Operational",
            &[],
        ),
        metric(
            "avg_delivery_time",
            "Avg Delivery Time",
            "Average delivery time in minutes",
            "AVG(s.delivery_seconds / 60.0)",
            ValueFormat::Duration,
            "Operational",
            &[],
        ),
        metric(
            "cancellation_rate",
            "Cancellation Rate",
            "Share of orders cancelled",
            "(COUNT(*) FILTER (WHERE s.sale_status_desc = 'CANCELLED') * 100.0 / NULLIF(COUNT(*), 0))",
            ValueFormat::Percentage,
            "Operational",
            &[],
        ),
        metric(
            "completion_rate",
            "Completion Rate",
            "Share of orders completed",
            "(COUNT(*) FILTER (WHERE s.sale_status_desc = 'COMPLETED') * 100.0 / NULLIF(COUNT(*), 0))",
            ValueFormat::Percentage,
            "Operational",
            &[],
        ),
        metric(
            "unique_customers",
            "Unique Customers",
            "Distinct customers ordering",
            "COUNT(DISTINCT s.customer_id)",
            ValueFormat::Number,
            "Customer",
            &[],
        ),
        metric(
            "avg_people_per_order",
            "Avg People per Order",
            "Average party size",
            "AVG(s.people_quantity)",
            ValueFormat::Number,
            "Customer",
            &[],
        ),
        metric(
            "product_variety",
            "Product Variety",
            "Distinct products sold",
            "COUNT(DISTINCT ps.product_id)",
            ValueFormat::Number,
            "Product",
            &[ProductSales],
        ),
    ];

    use DimensionKind::*;

    let mut dimensions = vec![
        dimension(
            "channel",
            "Channel",
            "Sales channel name",
            Entity,
            SourceExpression::column("channels", "name"),
            &[Channels],
        ),
        dimension(
            "store",
            "Store",
            "Store name",
            Entity,
            SourceExpression::column("stores", "name"),
            &[Stores],
        ),
        dimension(
            "product",
            "Product",
            "Product name",
            Entity,
            SourceExpression::column("products", "name"),
            &[ProductSales, Products],
        ),
        dimension(
            "product_category",
            "Product Category",
            "Category of the product sold",
            Entity,
            SourceExpression::column("categories", "name"),
            &[ProductSales, Products, Categories],
        ),
        dimension(
            "payment_type",
            "Payment Type",
            "How the order was paid",
            Entity,
            SourceExpression::column("payment_types", "description"),
            &[Payments, PaymentTypes],
        ),
        dimension(
            "date_hour",
            "Hour",
            "Hour of day the order was placed",
            Temporal,
            SourceExpression::Sql("EXTRACT(HOUR FROM s.created_at)".to_string()),
            &[],
        ),
        dimension(
            "date_day",
            "Day",
            "Calendar day of the order",
            Temporal,
            SourceExpression::Sql("DATE(s.created_at)".to_string()),
            &[],
        ),
        dimension(
            "date_week",
            "Week",
            "Week of the order",
            Temporal,
            SourceExpression::Sql("DATE_TRUNC('week', s.created_at)".to_string()),
            &[],
        ),
        dimension(
            "date_month",
            "Month",
            "Month of the order",
            Temporal,
            SourceExpression::Sql("DATE_TRUNC('month', s.created_at)".to_string()),
            &[],
        ),
        dimension(
            "date_quarter",
            "Quarter",
            "Quarter of the order",
            Temporal,
            SourceExpression::Sql("DATE_TRUNC('quarter', s.created_at)".to_string()),
            &[],
        ),
        dimension(
            "date_year",
            "Year",
            "Year of the order",
            Temporal,
            SourceExpression::Sql("DATE_TRUNC('year', s.created_at)".to_string()),
            &[],
        ),
        dimension(
            "sale_status",
            "Status",
            "Current order status",
            Categorical,
            SourceExpression::Sql("s.sale_status_desc".to_string()),
            &[],
        ),
        dimension(
            "channel_type",
            "Channel Type",
            "Kind of sales channel",
            Categorical,
            SourceExpression::column("channels", "type"),
            &[Channels],
        ),
        dimension(
            "store_city",
            "Store City",
            "City of the store",
            Geographical,
            SourceExpression::column("stores", "city"),
            &[Stores],
        ),
        dimension(
            "store_state",
            "Store State",
            "State of the store",
            Geographical,
            SourceExpression::column("stores", "state"),
            &[Stores],
        ),
        dimension(
            "delivery_neighborhood",
            "Delivery Neighborhood",
            "Neighborhood the order was delivered to",
            Geographical,
            SourceExpression::column("delivery_addresses", "neighborhood"),
            &[DeliveryAddresses],
        ),
        dimension(
            "delivery_city",
            "Delivery City",
            "City the order was delivered to",
            Geographical,
            SourceExpression::column("delivery_addresses", "city"),
            &[DeliveryAddresses],
        ),
    ];

    // TO_CHAR pads day names; not meaningful to sort lexically.
    let mut day_of_week = dimension(
        "day_of_week",
        "Day of Week",
        "Weekday name of the order",
        Temporal,
        SourceExpression::Sql("TO_CHAR(s.created_at, 'Day')".to_string()),
        &[],
    );
    day_of_week.sortable = false;
    dimensions.push(day_of_week);

    Catalog::from_parts(metrics, dimensions)
}
