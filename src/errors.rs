//! Error handling for metric naming and submetric derivation
//!
//! Core operations return [`MetricsError`], a closed set of failure categories
//! callers can match on without inspecting message text. Every variant converts
//! into a [`TylError`] so the crate plugs into the TYL error stack like the
//! other ports do.

use crate::TylError;

/// Prefix shared by every metric name parsing failure
pub const NAME_PARSING_PREFIX: &str = "parsing metric name failed";

/// Failures produced while parsing names, deriving submetrics or registering metrics
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    /// A `name{tag:value,...}` expression is malformed
    #[error("parsing metric name failed, {detail}")]
    NameParsing {
        /// Which rule fired, including the offending input
        detail: String,
    },

    /// Submetric criteria were empty after trimming
    #[error("submetric criteria for metric '{metric}' cannot be empty")]
    EmptyCriteria {
        /// The parent metric
        metric: String,
    },

    /// The criteria denote the same tag set as an existing submetric
    #[error("sub-metric with params '{criteria}' already exists for metric {metric}: {existing}")]
    DuplicateSubmetric {
        /// Trimmed criteria passed by the caller
        criteria: String,
        /// The parent metric
        metric: String,
        /// Name of the submetric already holding this tag set
        existing: String,
    },

    /// No sink exists for the requested metric kind
    #[error("unsupported metric type '{kind}'")]
    UnsupportedKind {
        /// The kind as supplied by the caller
        kind: String,
    },

    /// A metric name failed validation
    #[error("invalid metric name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// No metric with this name is registered
    #[error("metric '{name}' is not registered")]
    UnknownMetric { name: String },

    /// A metric already exists under this name with a different shape
    #[error("metric '{name}' already exists as {existing}, cannot redefine it as {requested}")]
    MetricConflict {
        name: String,
        existing: String,
        requested: String,
    },

    /// The per-metric submetric limit was reached
    #[error("metric '{metric}' already has the maximum of {limit} submetrics")]
    TooManySubmetrics { metric: String, limit: usize },
}

impl MetricsError {
    /// Whether this is a metric name parsing failure, whichever rule fired
    pub fn is_name_parsing(&self) -> bool {
        matches!(self, MetricsError::NameParsing { .. })
    }

    /// The field name used when this error is surfaced as a TYL validation error
    fn field(&self) -> &'static str {
        match self {
            MetricsError::NameParsing { .. } | MetricsError::InvalidName { .. } => "metric_name",
            MetricsError::EmptyCriteria { .. }
            | MetricsError::DuplicateSubmetric { .. }
            | MetricsError::TooManySubmetrics { .. } => "submetric",
            MetricsError::UnsupportedKind { .. } => "metric_type",
            MetricsError::UnknownMetric { .. } | MetricsError::MetricConflict { .. } => "metric",
        }
    }
}

/// Result type for core metrics operations
pub type MetricsResult<T> = std::result::Result<T, MetricsError>;

/// Build a name parsing error for `detail`
pub fn name_parsing_error(detail: impl Into<String>) -> MetricsError {
    MetricsError::NameParsing {
        detail: detail.into(),
    }
}

impl From<MetricsError> for TylError {
    fn from(error: MetricsError) -> Self {
        match error {
            // Unknown kinds come from callers breaking the contract, not from user input
            MetricsError::UnsupportedKind { .. } => {
                TylError::internal(format!("Metrics error: {error}"))
            }
            _ => TylError::validation(error.field().to_string(), error.to_string()),
        }
    }
}

/// Create a metrics configuration error
///
/// # Example
/// ```rust
/// use tyl_metrics_core::metrics_config_error;
///
/// let error = metrics_config_error("max_submetrics_per_metric", "must be greater than 0");
/// assert!(error.to_string().contains("max_submetrics_per_metric"));
/// ```
pub fn metrics_config_error(config_key: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::configuration(format!(
        "Metrics config error for {}: {}",
        config_key.into(),
        message.into()
    ))
}

/// Convert a JSON error raised while exporting a summary
pub fn from_serde_json_error(error: serde_json::Error) -> TylError {
    TylError::internal(format!(
        "Metrics serialization error for json: {}",
        error
    ))
}
