//! Reclaimer Metrics - Windowed GPU utilization sampling
//!
//! This crate provides:
//! - The `UtilizationSampler` trait the controller consumes
//! - A Prometheus HTTP API implementation issuing the windowed-average query
//! - The candidate filter that drops rows without pod identity

pub mod error;
pub mod filter;
pub mod prometheus;

pub use error::{MetricsError, Result};
pub use filter::filter_candidates;
pub use prometheus::PrometheusSampler;

use async_trait::async_trait;
use std::collections::BTreeMap;

/// One labeled row of the instant-vector query result, before candidate
/// filtering
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Series labels; `pod` and `namespace` are the ones of interest
    pub labels: BTreeMap<String, String>,
    /// Averaged utilization value
    pub value: f64,
}

/// Source of per-pod windowed-average utilization samples.
///
/// One query is issued per tick; a failure here aborts the whole tick (there
/// is nothing to evaluate) and the loop retries at the next interval.
#[async_trait]
pub trait UtilizationSampler: Send + Sync {
    async fn sample(&self) -> Result<Vec<RawSample>>;
}
