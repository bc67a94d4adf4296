use chrono::{DateTime, Utc};
use reclaimer_core::{PodSnapshot, PolicyConfig, SkipReason, UtilizationSample};

/// Everything an exemption check may consult
pub struct EvalContext<'a> {
    pub snapshot: &'a PodSnapshot,
    pub sample: &'a UtilizationSample,
    pub config: &'a PolicyConfig,
    pub now: DateTime<Utc>,
}

/// One exemption rule. Returns the skip reason when the rule fires.
pub trait ExemptionCheck: Send + Sync {
    fn check(&self, ctx: &EvalContext<'_>) -> Option<SkipReason>;

    /// Name of the check
    fn name(&self) -> &str;
}

/// Pods carrying the configured forbid label are never reclaimed. The key
/// being present with a different value does not exempt.
pub struct ForbidLabel;

impl ExemptionCheck for ForbidLabel {
    fn check(&self, ctx: &EvalContext<'_>) -> Option<SkipReason> {
        let (key, value) = ctx.config.forbid_label.as_ref()?;
        if ctx.snapshot.labels.get(key) == Some(value) {
            return Some(SkipReason::ProtectedByLabel);
        }
        None
    }

    fn name(&self) -> &str {
        "ForbidLabel"
    }
}

/// Utilization strictly above the threshold counts as active;
/// exactly-at-threshold counts as idle.
pub struct ActiveUtilization;

impl ExemptionCheck for ActiveUtilization {
    fn check(&self, ctx: &EvalContext<'_>) -> Option<SkipReason> {
        if ctx.sample.average_utilization > ctx.config.utilization_threshold {
            return Some(SkipReason::ActivelyUsed);
        }
        None
    }

    fn name(&self) -> &str {
        "ActiveUtilization"
    }
}

/// Workloads pinned to an exempt accelerator type via node selector are left
/// alone. Absence of the selector key is not exempting.
pub struct IgnoredAcceleratorType;

impl ExemptionCheck for IgnoredAcceleratorType {
    fn check(&self, ctx: &EvalContext<'_>) -> Option<SkipReason> {
        let accelerator = ctx
            .snapshot
            .node_selector
            .get(&ctx.config.accelerator_type_key)?;
        if ctx.config.is_ignored_accelerator(accelerator) {
            return Some(SkipReason::ExemptAcceleratorType);
        }
        None
    }

    fn name(&self) -> &str {
        "IgnoredAcceleratorType"
    }
}

/// A pod with no running container (pending, crash-looping, terminated) has
/// not had a chance to use its GPU and is never reclaimed. A running pod
/// whose start time cannot be determined is treated the same way rather than
/// failing the evaluation.
pub struct NotYetRunning;

impl ExemptionCheck for NotYetRunning {
    fn check(&self, ctx: &EvalContext<'_>) -> Option<SkipReason> {
        if !ctx.snapshot.container_running || ctx.snapshot.started_at.is_none() {
            return Some(SkipReason::NotRunning);
        }
        None
    }

    fn name(&self) -> &str {
        "NotYetRunning"
    }
}

/// A pod that has been running for less than the minimum runtime is still
/// inside its observation window; judging it idle now would only reflect
/// insufficient data. Running exactly the minimum runtime is not exempt.
pub struct GracePeriod;

impl ExemptionCheck for GracePeriod {
    fn check(&self, ctx: &EvalContext<'_>) -> Option<SkipReason> {
        let started_at = ctx.snapshot.started_at?;
        let min_runtime = chrono::Duration::from_std(ctx.config.min_runtime)
            .unwrap_or_else(|_| chrono::Duration::seconds(3600));

        if ctx.now - started_at < min_runtime {
            return Some(SkipReason::WithinGracePeriod);
        }
        None
    }

    fn name(&self) -> &str {
        "GracePeriod"
    }
}

/// The exemption checks in priority order; the first match wins
pub fn default_checks() -> Vec<Box<dyn ExemptionCheck>> {
    vec![
        Box::new(ForbidLabel),
        Box::new(ActiveUtilization),
        Box::new(IgnoredAcceleratorType),
        Box::new(NotYetRunning),
        Box::new(GracePeriod),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn snapshot() -> PodSnapshot {
        PodSnapshot {
            name: "gpu-pod".to_string(),
            namespace: "ml".to_string(),
            uid: None,
            labels: Default::default(),
            owner: None,
            node_selector: Default::default(),
            container_running: true,
            started_at: Some(Utc::now() - chrono::Duration::hours(2)),
        }
    }

    fn sample(utilization: f64) -> UtilizationSample {
        UtilizationSample {
            pod_name: "gpu-pod".to_string(),
            namespace: "ml".to_string(),
            accelerator_id: None,
            average_utilization: utilization,
            window: "1h".to_string(),
        }
    }

    fn config() -> PolicyConfig {
        PolicyConfig {
            utilization_threshold: 0.01,
            min_runtime: Duration::from_secs(3600),
            forbid_label: Some(("reclaim/forbid".to_string(), "true".to_string())),
            accelerator_type_key: "nvidia.com/gpu.product".to_string(),
            ignored_accelerator_types: ["tesla-t4".to_string()].into_iter().collect(),
        }
    }

    fn ctx<'a>(
        snapshot: &'a PodSnapshot,
        sample: &'a UtilizationSample,
        config: &'a PolicyConfig,
        now: DateTime<Utc>,
    ) -> EvalContext<'a> {
        EvalContext {
            snapshot,
            sample,
            config,
            now,
        }
    }

    #[test]
    fn test_forbid_label_exact_value_only() {
        let config = config();
        let sample = sample(0.0);

        let mut snap = snapshot();
        snap.labels
            .insert("reclaim/forbid".to_string(), "true".to_string());
        assert_eq!(
            ForbidLabel.check(&ctx(&snap, &sample, &config, Utc::now())),
            Some(SkipReason::ProtectedByLabel)
        );

        // Same key, different value: not exempt
        snap.labels
            .insert("reclaim/forbid".to_string(), "false".to_string());
        assert_eq!(
            ForbidLabel.check(&ctx(&snap, &sample, &config, Utc::now())),
            None
        );
    }

    #[test]
    fn test_forbid_label_disabled_when_unconfigured() {
        let config = PolicyConfig {
            forbid_label: None,
            ..config()
        };
        let sample = sample(0.0);
        let mut snap = snapshot();
        snap.labels
            .insert("reclaim/forbid".to_string(), "true".to_string());

        assert_eq!(
            ForbidLabel.check(&ctx(&snap, &sample, &config, Utc::now())),
            None
        );
    }

    /// The threshold is a strict inequality: exactly-at-threshold is idle.
    #[test]
    fn test_utilization_threshold_boundary() {
        let config = config();
        let snap = snapshot();

        let at_threshold = sample(0.01);
        assert_eq!(
            ActiveUtilization.check(&ctx(&snap, &at_threshold, &config, Utc::now())),
            None
        );

        let above = sample(0.010001);
        assert_eq!(
            ActiveUtilization.check(&ctx(&snap, &above, &config, Utc::now())),
            Some(SkipReason::ActivelyUsed)
        );

        let zero = sample(0.0);
        assert_eq!(
            ActiveUtilization.check(&ctx(&snap, &zero, &config, Utc::now())),
            None
        );
    }

    #[test]
    fn test_ignored_accelerator_type_case_insensitive() {
        let config = config();
        let sample = sample(0.0);

        let mut snap = snapshot();
        snap.node_selector.insert(
            "nvidia.com/gpu.product".to_string(),
            "Tesla-T4".to_string(),
        );
        assert_eq!(
            IgnoredAcceleratorType.check(&ctx(&snap, &sample, &config, Utc::now())),
            Some(SkipReason::ExemptAcceleratorType)
        );

        // A non-ignored type is not exempt
        snap.node_selector.insert(
            "nvidia.com/gpu.product".to_string(),
            "Tesla-V100".to_string(),
        );
        assert_eq!(
            IgnoredAcceleratorType.check(&ctx(&snap, &sample, &config, Utc::now())),
            None
        );
    }

    #[test]
    fn test_missing_selector_key_is_not_exempt() {
        let config = config();
        let sample = sample(0.0);
        let snap = snapshot();

        assert_eq!(
            IgnoredAcceleratorType.check(&ctx(&snap, &sample, &config, Utc::now())),
            None
        );
    }

    #[test]
    fn test_not_running_covers_missing_start_time() {
        let config = config();
        let sample = sample(0.0);

        let mut snap = snapshot();
        snap.container_running = false;
        snap.started_at = None;
        assert_eq!(
            NotYetRunning.check(&ctx(&snap, &sample, &config, Utc::now())),
            Some(SkipReason::NotRunning)
        );

        // Running but with no determinable start time: also NotRunning
        snap.container_running = true;
        assert_eq!(
            NotYetRunning.check(&ctx(&snap, &sample, &config, Utc::now())),
            Some(SkipReason::NotRunning)
        );
    }

    /// The grace comparison is strictly-less: running exactly min_runtime is
    /// already eligible.
    #[test]
    fn test_grace_period_boundary() {
        let config = config();
        let sample = sample(0.0);
        let now = Utc::now();

        let mut snap = snapshot();
        snap.started_at = Some(now - chrono::Duration::seconds(3600));
        assert_eq!(GracePeriod.check(&ctx(&snap, &sample, &config, now)), None);

        snap.started_at = Some(now - chrono::Duration::seconds(3599));
        assert_eq!(
            GracePeriod.check(&ctx(&snap, &sample, &config, now)),
            Some(SkipReason::WithinGracePeriod)
        );
    }

    #[test]
    fn test_default_check_order() {
        let checks = default_checks();
        let names: Vec<&str> = checks.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "ForbidLabel",
                "ActiveUtilization",
                "IgnoredAcceleratorType",
                "NotYetRunning",
                "GracePeriod",
            ]
        );
    }
}
