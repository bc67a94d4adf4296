//! Reclaimer Policy - Idle-workload decision logic
//!
//! This crate provides:
//! - Exemption checks evaluated in strict priority order
//! - The pure policy evaluator turning a pod snapshot plus a utilization
//!   sample into a verdict
//!
//! The evaluator is deterministic and side-effect free: the clock is an
//! explicit argument, and identical inputs always yield identical verdicts.
//! Which concrete action a reclaimable pod receives is decided later by
//! ownership resolution, not here.

pub mod checks;

pub use checks::{default_checks, EvalContext, ExemptionCheck};

use chrono::{DateTime, Utc};
use reclaimer_core::{PodSnapshot, PolicyConfig, SkipReason, UtilizationSample};
use tracing::debug;

/// Outcome of policy evaluation for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// An exemption fired; leave the workload alone
    Exempt(SkipReason),
    /// No exemption fired; the workload is idle and may be reclaimed
    Reclaimable,
}

/// Policy evaluator holding the ordered exemption checks
pub struct PolicyEvaluator {
    config: PolicyConfig,
    checks: Vec<Box<dyn ExemptionCheck>>,
}

impl PolicyEvaluator {
    /// Create an evaluator with the default check order
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            checks: default_checks(),
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Evaluate one candidate. The first matching exemption short-circuits;
    /// check order is the declared priority order.
    pub fn evaluate(
        &self,
        snapshot: &PodSnapshot,
        sample: &UtilizationSample,
        now: DateTime<Utc>,
    ) -> Verdict {
        let ctx = EvalContext {
            snapshot,
            sample,
            config: &self.config,
            now,
        };

        for check in &self.checks {
            if let Some(reason) = check.check(&ctx) {
                debug!(
                    "Pod {}/{} exempt by {}: {}",
                    snapshot.namespace,
                    snapshot.name,
                    check.name(),
                    reason
                );
                return Verdict::Exempt(reason);
            }
        }

        Verdict::Reclaimable
    }
}
