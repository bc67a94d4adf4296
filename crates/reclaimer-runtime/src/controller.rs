use crate::error::{Result, RuntimeError};
use crate::executor::{execute, ExecutionOutcome};
use crate::resolver::resolve;
use crate::traits::Orchestrator;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use reclaimer_core::{
    Decision, PodSnapshot, PolicyConfig, SkipReason, TargetKind, UtilizationSample,
};
use reclaimer_metrics::{filter_candidates, UtilizationSampler};
use reclaimer_policy::{PolicyEvaluator, Verdict};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Configuration for the reclamation controller loop
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Interval between reclamation cycles
    pub tick_interval: Duration,
    /// The utilization averaging window as a PromQL range string
    pub window: String,
    /// Upper bound on candidates processed concurrently within one tick
    pub max_concurrent_candidates: usize,
    /// Evaluate and log decisions without issuing any mutation
    pub dry_run: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            window: "1h".to_string(),
            max_concurrent_candidates: 4,
            dry_run: false,
        }
    }
}

/// Stage at which a candidate was abandoned for the tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Resolve,
    Execute,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Resolve => write!(f, "resolve"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// Per-candidate result within one tick. Failures are values collected by
/// the loop, never control flow that could take sibling candidates down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    Skipped(SkipReason),
    Reclaimed(TargetKind),
    /// Dry-run stand-in for an action that would have been executed
    WouldReclaim(TargetKind),
    AlreadyGone,
    Failed(FailureStage),
}

/// Aggregated outcome counts for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub candidates: usize,
    pub skipped: usize,
    pub reclaimed: usize,
    pub would_reclaim: usize,
    pub already_gone: usize,
    pub failed: usize,
}

impl TickSummary {
    fn from_outcomes(outcomes: &[CandidateOutcome]) -> Self {
        let mut summary = Self {
            candidates: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                CandidateOutcome::Skipped(_) => summary.skipped += 1,
                CandidateOutcome::Reclaimed(_) => summary.reclaimed += 1,
                CandidateOutcome::WouldReclaim(_) => summary.would_reclaim += 1,
                CandidateOutcome::AlreadyGone => summary.already_gone += 1,
                CandidateOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates: {} reclaimed, {} would reclaim, {} already gone, {} skipped, {} failed",
            self.candidates,
            self.reclaimed,
            self.would_reclaim,
            self.already_gone,
            self.skipped,
            self.failed
        )
    }
}

/// The reclamation loop: sample, filter, then evaluate/resolve/execute each
/// candidate independently on a fixed tick.
///
/// Ticks never overlap; the next sampling only begins after the previous
/// candidate pass completes. Within a tick, candidates are processed with
/// bounded concurrency and fully isolated outcomes.
pub struct ReclaimController {
    sampler: Arc<dyn UtilizationSampler>,
    orchestrator: Arc<dyn Orchestrator>,
    evaluator: PolicyEvaluator,
    config: ControllerConfig,
}

impl ReclaimController {
    pub fn new(
        sampler: Arc<dyn UtilizationSampler>,
        orchestrator: Arc<dyn Orchestrator>,
        policy: PolicyConfig,
        config: ControllerConfig,
    ) -> Self {
        Self {
            sampler,
            orchestrator,
            evaluator: PolicyEvaluator::new(policy),
            config,
        }
    }

    /// Run the reclamation loop until cancelled.
    ///
    /// Cancellation stops scheduling new ticks; an in-flight tick finishes
    /// its already-dispatched candidate operations first, so no action is
    /// left half-applied by shutdown.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        info!(
            "Starting reclamation controller (tick: {:?}, window: {}, dry_run: {})",
            self.config.tick_interval, self.config.window, self.config.dry_run
        );

        let mut interval = tokio::time::interval(self.config.tick_interval);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Reclamation controller shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    // A failed tick is logged and retried at the next
                    // interval; it is never fatal to the process
                    if let Err(e) = self.tick().await {
                        error!("Tick aborted: {}", e);
                    }
                }
            }
        }
    }

    /// Run a single reclamation cycle
    pub async fn tick(&self) -> Result<TickSummary> {
        let raw = self.sampler.sample().await?;
        let candidates = filter_candidates(raw, &self.config.window);

        if candidates.is_empty() {
            debug!("No candidates with pod identity this tick");
            return Ok(TickSummary::default());
        }

        debug!("Processing {} candidates", candidates.len());

        let outcomes: Vec<CandidateOutcome> = stream::iter(candidates)
            .map(|candidate| self.process_candidate(candidate))
            .buffer_unordered(self.config.max_concurrent_candidates.max(1))
            .collect()
            .await;

        let summary = TickSummary::from_outcomes(&outcomes);
        info!("Tick complete: {}", summary);
        Ok(summary)
    }

    /// Fetch, evaluate, resolve, and execute one candidate. All failures are
    /// folded into the returned outcome.
    async fn process_candidate(&self, sample: UtilizationSample) -> CandidateOutcome {
        let pod = match self
            .orchestrator
            .get_pod(&sample.namespace, &sample.pod_name)
            .await
        {
            Ok(pod) => pod,
            Err(e) => {
                warn!(
                    "Failed to fetch pod {}/{}: {}",
                    sample.namespace, sample.pod_name, e
                );
                return CandidateOutcome::Failed(FailureStage::Fetch);
            }
        };

        let snapshot = match PodSnapshot::from_pod(&pod) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "Unusable snapshot for pod {}/{}: {}",
                    sample.namespace, sample.pod_name, e
                );
                return CandidateOutcome::Failed(FailureStage::Fetch);
            }
        };

        // The decision is computed once per candidate per tick: the
        // evaluator supplies the verdict, ownership shape the concrete action
        let decision = match self.evaluator.evaluate(&snapshot, &sample, Utc::now()) {
            Verdict::Exempt(reason) => Decision::Skip(reason),
            Verdict::Reclaimable => {
                match resolve(self.orchestrator.as_ref(), &snapshot).await {
                    Ok(action) => Decision::Reclaim(action),
                    Err(e @ RuntimeError::UnresolvableOwner { .. }) => {
                        warn!("{}", e);
                        Decision::Skip(SkipReason::UnresolvableOwner)
                    }
                    Err(e) => {
                        error!(
                            "Failed to resolve owner chain for pod {}/{}: {}",
                            snapshot.namespace, snapshot.name, e
                        );
                        return CandidateOutcome::Failed(FailureStage::Resolve);
                    }
                }
            }
        };

        match decision {
            Decision::Skip(reason) => {
                debug!(
                    "Skipping pod {}/{}: {}",
                    snapshot.namespace, snapshot.name, reason
                );
                CandidateOutcome::Skipped(reason)
            }
            Decision::Reclaim(action) => {
                info!(
                    "Pod {}/{} idle (avg {:.4} over {}): {}",
                    snapshot.namespace,
                    snapshot.name,
                    sample.average_utilization,
                    sample.window,
                    action
                );

                if self.config.dry_run {
                    return CandidateOutcome::WouldReclaim(action.target().kind);
                }

                match execute(self.orchestrator.as_ref(), &action, &sample.window).await {
                    Ok(ExecutionOutcome::Reclaimed) => {
                        CandidateOutcome::Reclaimed(action.target().kind)
                    }
                    Ok(ExecutionOutcome::AlreadyGone) => CandidateOutcome::AlreadyGone,
                    Err(e) => {
                        // No in-tick retry: the next tick re-observes the
                        // same idle condition if it still holds
                        error!("Failed to execute '{}': {}", action, e);
                        CandidateOutcome::Failed(FailureStage::Execute)
                    }
                }
            }
        }
    }
}
