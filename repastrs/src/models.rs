use serde::{Deserialize, Serialize};

/// A declarative report description: which metrics to aggregate, how to group,
/// filter and order them, and an optional comparison period.
///
/// Field order is fixed by this struct; serializing a request therefore yields
/// a canonical form regardless of the key order of the incoming JSON, which is
/// what the cache fingerprint relies on.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryRequest {
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub comparison: Option<Comparison>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    /// A dimension id, or a raw column name on the base table.
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    /// How this filter combines with the *next* one (default AND).
    pub logical_operator: Option<LogicalOperator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "BETWEEN")]
    Between,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// Closed set of filter value shapes. Untagged so plain JSON scalars and
/// arrays deserialize directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Flatten into individual bind values: lists contribute each element,
    /// scalars contribute themselves.
    pub fn elements(&self) -> Vec<FilterValue> {
        match self {
            FilterValue::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Null => write!(f, "NULL"),
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::String(s) => write!(f, "'{s}'"),
            FilterValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Derived secondary date range used to compute trend deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: ComparisonKind,
    pub custom_start: Option<String>,
    pub custom_end: Option<String>,
    /// Explicitly designates which filter carries the primary period.
    /// When unset the engine falls back to name matching (a field containing
    /// "date", or the created_at column).
    pub date_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    PreviousPeriod,
    SamePeriodLastYear,
    Custom,
}
