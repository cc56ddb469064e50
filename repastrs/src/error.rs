use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Request-shape errors caught before any SQL is built.
/// All variants are caller-correctable and safe to surface verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one metric must be selected")]
    NoMetricsSelected,
    #[error("metric '{0}' not found in catalog")]
    UnknownMetric(String),
    #[error("dimension '{0}' not found in catalog")]
    UnknownDimension(String),
    #[error("dimension '{0}' cannot be used for grouping")]
    DimensionNotGroupable(String),
    #[error("limit {0} outside allowed range [1, 10000]")]
    LimitOutOfRange(u32),
}

/// Errors raised while turning a valid request into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    #[error("period comparison requires a date filter")]
    MissingDateFilterForComparison,
    #[error("custom comparison requires both start and end dates")]
    MissingCustomDates,
    #[error("could not parse '{0}' as a date")]
    InvalidDateValue(String),
    #[error("BETWEEN requires exactly two values: {0}")]
    InvalidBetweenValues(String),
    #[error("filter field '{0}' is not a valid column identifier")]
    InvalidFilterField(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("compilation error: {0}")]
    Compilation(#[from] CompilationError),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
