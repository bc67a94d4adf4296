use crate::error::{ReclaimerError, Result};
use std::collections::HashSet;
use std::time::Duration;

/// Process-wide reclamation policy, constructed once at startup and passed
/// explicitly into the evaluator. Never read from ambient global state.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Utilization strictly above this value counts as active
    pub utilization_threshold: f64,
    /// Minimum running time before a pod becomes eligible for reclamation
    pub min_runtime: Duration,
    /// Pods carrying exactly this label key/value are never reclaimed
    pub forbid_label: Option<(String, String)>,
    /// Node-selector key that names the accelerator type
    pub accelerator_type_key: String,
    /// Accelerator types exempt from reclamation, lowercased
    pub ignored_accelerator_types: HashSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            utilization_threshold: 0.01,
            min_runtime: Duration::from_secs(3600),
            forbid_label: None,
            accelerator_type_key: "nvidia.com/gpu.product".to_string(),
            ignored_accelerator_types: HashSet::new(),
        }
    }
}

impl PolicyConfig {
    /// Check whether an accelerator type is exempt (case-insensitive)
    pub fn is_ignored_accelerator(&self, accelerator_type: &str) -> bool {
        self.ignored_accelerator_types
            .contains(&accelerator_type.to_lowercase())
    }
}

/// Parse a `key=value` forbid-label selector. An empty string disables the
/// check.
pub fn parse_forbid_label(value: &str) -> Result<Option<(String, String)>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    match value.split_once('=') {
        Some((key, label_value)) if !key.is_empty() => {
            Ok(Some((key.to_string(), label_value.to_string())))
        }
        _ => Err(ReclaimerError::invalid_label_selector(value)),
    }
}

/// Parse a comma-separated list of exempt accelerator types, lowercasing each
/// entry for case-insensitive matching
pub fn parse_ignored_accelerator_types(value: &str) -> HashSet<String> {
    value
        .split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}
