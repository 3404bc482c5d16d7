//! Aggregation sinks
//!
//! Each metric kind owns exactly one sink implementation. The mapping from
//! kind to sink is exhaustive, so adding a kind without a sink fails to compile.

use crate::types::{MetricType, Sample};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// Aggregation strategy attached to a metric
pub trait Sink: Send + Sync + std::fmt::Debug {
    /// Fold a sample into the aggregate
    fn add(&mut self, sample: &Sample);

    /// Summarize the aggregate; `elapsed` is the length of the collection window
    fn format(&self, elapsed: Duration) -> BTreeMap<String, f64>;

    /// The metric kind this sink aggregates
    fn kind(&self) -> MetricType;
}

/// Instantiate the sink for a metric kind
pub fn new_sink(metric_type: MetricType) -> Box<dyn Sink> {
    match metric_type {
        MetricType::Counter => Box::new(CounterSink::default()),
        MetricType::Gauge => Box::new(GaugeSink::default()),
        MetricType::Trend => Box::new(TrendSink::default()),
        MetricType::Rate => Box::new(RateSink::default()),
    }
}

/// Sums values and reports the per-second rate
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CounterSink {
    pub value: f64,
    pub first: Option<SystemTime>,
}

impl Sink for CounterSink {
    fn add(&mut self, sample: &Sample) {
        self.value += sample.value;
        if self.first.is_none() {
            self.first = Some(sample.time);
        }
    }

    fn format(&self, elapsed: Duration) -> BTreeMap<String, f64> {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { self.value / secs } else { 0.0 };
        BTreeMap::from([("count".to_string(), self.value), ("rate".to_string(), rate)])
    }

    fn kind(&self) -> MetricType {
        MetricType::Counter
    }
}

/// Keeps the last value along with the observed extremes
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GaugeSink {
    pub value: f64,
    pub max: f64,
    pub min: f64,
    min_set: bool,
}

impl Sink for GaugeSink {
    fn add(&mut self, sample: &Sample) {
        let v = sample.value;
        self.value = v;
        if v > self.max {
            self.max = v;
        }
        if v < self.min || !self.min_set {
            self.min = v;
            self.min_set = true;
        }
    }

    fn format(&self, _elapsed: Duration) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("value".to_string(), self.value),
            ("min".to_string(), self.min),
            ("max".to_string(), self.max),
        ])
    }

    fn kind(&self) -> MetricType {
        MetricType::Gauge
    }
}

/// Retains every value to report distribution statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrendSink {
    values: Vec<f64>,
    sum: f64,
    min: f64,
    max: f64,
}

impl TrendSink {
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Linearly interpolated percentile, `pct` in `0.0..=1.0`
    pub fn percentile(&self, pct: f64) -> f64 {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);

        match sorted.len() {
            0 => 0.0,
            1 => sorted[0],
            n => {
                let rank = pct.clamp(0.0, 1.0) * (n - 1) as f64;
                let lower = rank.floor() as usize;
                if lower >= n - 1 {
                    return sorted[n - 1];
                }
                sorted[lower] + (sorted[lower + 1] - sorted[lower]) * (rank - lower as f64)
            }
        }
    }
}

impl Sink for TrendSink {
    fn add(&mut self, sample: &Sample) {
        let v = sample.value;
        if self.values.is_empty() {
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.sum += v;
        self.values.push(v);
    }

    fn format(&self, _elapsed: Duration) -> BTreeMap<String, f64> {
        let avg = if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        };
        BTreeMap::from([
            ("min".to_string(), self.min),
            ("max".to_string(), self.max),
            ("avg".to_string(), avg),
            ("med".to_string(), self.percentile(0.5)),
            ("p(90)".to_string(), self.percentile(0.90)),
            ("p(95)".to_string(), self.percentile(0.95)),
        ])
    }

    fn kind(&self) -> MetricType {
        MetricType::Trend
    }
}

/// Counts how many samples were non-zero
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RateSink {
    pub trues: u64,
    pub total: u64,
}

impl Sink for RateSink {
    fn add(&mut self, sample: &Sample) {
        self.total += 1;
        if sample.value != 0.0 {
            self.trues += 1;
        }
    }

    fn format(&self, _elapsed: Duration) -> BTreeMap<String, f64> {
        let rate = if self.total == 0 {
            0.0
        } else {
            self.trues as f64 / self.total as f64
        };
        BTreeMap::from([("rate".to_string(), rate)])
    }

    fn kind(&self) -> MetricType {
        MetricType::Rate
    }
}
