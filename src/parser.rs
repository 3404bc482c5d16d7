//! Metric name expression parsing
//!
//! A metric name expression is either a bare name or a name followed by a
//! brace-delimited list of `key:value` tag clauses, e.g.
//! `http_req_duration{status:200,method:GET}`.
//!
//! The clauses returned here are validated strictly (a colon and a non-empty
//! key and value are required). [`Metric::add_submetric`](crate::Metric::add_submetric)
//! re-parses its criteria with a more permissive grammar that accepts quoted
//! keys and values and bare keys. The two grammars are intentionally kept
//! apart; [`join_tag_clauses`] is the only bridge between them.

use crate::errors::{name_parsing_error, MetricsResult};

/// Parse a metric name expression of the form `metric_name{tag_key:tag_value,...}`
///
/// Returns the base name and the tag clauses as trimmed `"key:value"` strings
/// in their original order. Every failure is a
/// [`MetricsError::NameParsing`](crate::MetricsError::NameParsing).
///
/// # Examples
/// ```rust
/// use tyl_metrics_core::parse_metric_name;
///
/// let (name, tags) = parse_metric_name("req{status:200,method:GET}").unwrap();
/// assert_eq!(name, "req");
/// assert_eq!(tags, vec!["status:200", "method:GET"]);
///
/// assert!(parse_metric_name("req{status:200").unwrap_err().is_name_parsing());
/// ```
pub fn parse_metric_name(expr: &str) -> MetricsResult<(String, Vec<String>)> {
    let opening = expr.find('{');
    let closing = expr.rfind('}');

    let (opening, closing) = match (opening, closing) {
        (None, None) => return Ok((expr.to_string(), Vec::new())),
        (Some(open), Some(close)) => (open, close),
        _ => {
            return Err(name_parsing_error(format!(
                "metric {expr:?} has unmatched opening/close curly brace"
            )))
        }
    };

    if closing < opening {
        return Err(name_parsing_error(format!(
            "metric {expr:?} closing curly brace appears before opening one"
        )));
    }

    if closing != expr.len() - 1 {
        return Err(name_parsing_error(format!(
            "metric {expr:?} lacks a closing curly brace in its last position"
        )));
    }

    let tags = expr[opening + 1..closing]
        .split(',')
        .map(|clause| match clause.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
                Ok(clause.trim().to_string())
            }
            _ => Err(name_parsing_error(format!(
                "metric {clause:?} tag expression is malformed"
            ))),
        })
        .collect::<MetricsResult<Vec<_>>>()?;

    Ok((expr[..opening].to_string(), tags))
}

/// Join parsed tag clauses into submetric criteria
///
/// ```rust
/// use tyl_metrics_core::{join_tag_clauses, parse_metric_name};
///
/// let (_, tags) = parse_metric_name("req{status:200, method:GET}").unwrap();
/// assert_eq!(join_tag_clauses(&tags), "status:200,method:GET");
/// ```
pub fn join_tag_clauses(clauses: &[String]) -> String {
    clauses.join(",")
}
