//! # TYL Metrics Core
//!
//! Naming, tagging and submetric derivation for the TYL metrics subsystem.
//!
//! A metric is declared with a name, a [`MetricType`] and a [`ValueType`]. A metric name
//! expression may carry a tag filter, `http_req_duration{status:200}`, which selects a
//! **submetric**: a view over the parent's samples restricted to those carrying the
//! given tags. Each submetric is backed by its own metric of the same kind, so it
//! aggregates independently.
//!
//! - [`parse_metric_name`] splits an expression into its base name and tag clauses
//! - [`Metric::add_submetric`] derives a submetric from `key:value` criteria and
//!   rejects criteria denoting a tag set that already has a submetric
//! - [`MetricsRegistry`] owns metrics behind per-metric locks and resolves
//!   expressions to metrics or submetrics, deriving them on first reference
//!
//! ## Two grammars
//!
//! The parser is strict: every clause needs a colon with a non-empty key and value.
//! `add_submetric` is lenient: it accepts bare keys and quoted keys and values. They
//! are intentionally not unified. Feed parser output to `add_submetric` with
//! [`join_tag_clauses`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::SystemTime;
//! use tyl_metrics_core::{Metric, MetricType, SampleTags, ValueType, parse_metric_name, join_tag_clauses};
//!
//! let (name, clauses) = parse_metric_name("http_reqs{status:200}").unwrap();
//! let mut metric = Metric::new(name, MetricType::Counter, ValueType::Default);
//! metric.add_submetric(&join_tag_clauses(&clauses)).unwrap();
//!
//! let tags: SampleTags = [("status", "200"), ("method", "GET")].into_iter().collect();
//! let sample = metric.sample(SystemTime::now(), Arc::new(tags), 1.0);
//! metric.ingest(&sample);
//! assert!(metric.submetrics()[0].metric().is_observed());
//! ```

// Re-export TYL framework functionality
pub use tyl_errors::{TylError, TylResult};

// Domain types
mod types;
pub use types::{MetricType, Sample, SampleTags, ValueType};

// Error handling for the metrics domain
mod errors;
pub use errors::{
    from_serde_json_error, metrics_config_error, name_parsing_error, MetricsError, MetricsResult,
    NAME_PARSING_PREFIX,
};

// Aggregation sinks
mod sink;
pub use sink::{new_sink, CounterSink, GaugeSink, RateSink, Sink, TrendSink};

// Name expression parsing
mod parser;
pub use parser::{join_tag_clauses, parse_metric_name};

// Metrics and submetrics
mod metric;
pub use metric::{Metric, Submetric, SubmetricLink};

// Registry and its configuration
mod registry;
pub use registry::{MetricHandle, MetricsRegistry, RegistryConfig};

// Validation utilities
mod utils;
pub use utils::{format_tags, validate_metric_name};

/// Result type for configuration and export operations using TYL error handling
pub type Result<T> = TylResult<T>;
