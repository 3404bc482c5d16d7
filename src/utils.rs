//! Validation utilities for metric names and tags

use crate::errors::{MetricsError, MetricsResult};
use crate::types::SampleTags;
use lazy_static::lazy_static;
use regex::Regex;

// Maximum allowed length of a metric name
const MAX_METRIC_NAME_LENGTH: usize = 128;

lazy_static! {
    static ref METRIC_NAME_REGEX: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_.\-]*$").unwrap();
}

/// Validate a metric name
///
/// Names must be non-empty, start with a letter or underscore and contain only
/// letters, digits, underscores, dots and dashes. Tag filters are not part of a
/// name; split them off with [`parse_metric_name`](crate::parse_metric_name) first.
///
/// # Examples
/// ```rust
/// use tyl_metrics_core::validate_metric_name;
///
/// assert!(validate_metric_name("http_req_duration").is_ok());
/// assert!(validate_metric_name("http_req_duration{status:200}").is_err());
/// ```
pub fn validate_metric_name(name: &str) -> MetricsResult<()> {
    let invalid = |reason: String| MetricsError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("metric name cannot be empty".to_string()));
    }

    if name.chars().count() > MAX_METRIC_NAME_LENGTH {
        return Err(invalid(format!(
            "metric name too long (max {MAX_METRIC_NAME_LENGTH} chars)"
        )));
    }

    if !METRIC_NAME_REGEX.is_match(name) {
        return Err(invalid(
            "invalid metric name format (must match [a-zA-Z_][a-zA-Z0-9_.-]*)".to_string(),
        ));
    }

    Ok(())
}

/// Format tags as a string for logging/debugging
///
/// The format is `key1=value1,key2=value2`, sorted by key.
pub fn format_tags(tags: &SampleTags) -> String {
    if tags.is_empty() {
        return "{}".to_string();
    }

    tags.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
