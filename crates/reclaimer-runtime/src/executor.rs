use crate::error::{Result, RuntimeError};
use crate::traits::Orchestrator;
use chrono::Utc;
use k8s_openapi::api::core::v1::{Event, EventSource, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use reclaimer_core::{ReclaimAction, ReclaimTarget};
use tracing::{info, warn};
use uuid::Uuid;

/// Event reason recorded when a deployment is scaled to zero
pub const SCALEDOWN_EVENT_REASON: &str = "IdleAcceleratorScaledown";

/// Component name stamped on audit events
const COMPONENT: &str = "gpu-reclaimer";

/// Outcome of executing one reclamation action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The action was applied
    Reclaimed,
    /// The target no longer existed; the desired end state already holds
    AlreadyGone,
}

/// Perform the reclamation side effect for a non-skip decision.
///
/// A vanished target (deleted or scaled by a concurrent actor, or terminated
/// naturally) is success-equivalent: logged at info and reported as
/// `AlreadyGone`, with no retry and no escalation. Any other failure
/// propagates; the caller abandons the candidate for this tick and the next
/// tick re-observes the same condition if it still holds.
pub async fn execute(
    orchestrator: &dyn Orchestrator,
    action: &ReclaimAction,
    window: &str,
) -> Result<ExecutionOutcome> {
    match action {
        ReclaimAction::DeletePod(target) => {
            tolerate_not_found(
                orchestrator.delete_pod(&target.namespace, &target.name).await,
                target,
            )
        }
        ReclaimAction::DeleteJob(target) => {
            // Dependent pods are left to the orchestrator's garbage
            // collection; the executor never deletes them separately
            tolerate_not_found(
                orchestrator.delete_job(&target.namespace, &target.name).await,
                target,
            )
        }
        ReclaimAction::ScaleDownDeployment(target) => {
            match tolerate_not_found(
                orchestrator
                    .scale_deployment(&target.namespace, &target.name, 0)
                    .await,
                target,
            )? {
                ExecutionOutcome::AlreadyGone => Ok(ExecutionOutcome::AlreadyGone),
                ExecutionOutcome::Reclaimed => {
                    // The scale patch is already applied; a failed audit
                    // event must not turn the reclamation into a failure
                    let event = scaledown_event(target, window);
                    if let Err(e) = orchestrator.create_event(&target.namespace, &event).await {
                        warn!(
                            "Failed to record scaledown event for {}: {}",
                            target, e
                        );
                    }
                    Ok(ExecutionOutcome::Reclaimed)
                }
            }
        }
    }
}

fn tolerate_not_found(result: Result<()>, target: &ReclaimTarget) -> Result<ExecutionOutcome> {
    match result {
        Ok(()) => {
            info!("Reclaimed {}", target);
            Ok(ExecutionOutcome::Reclaimed)
        }
        Err(RuntimeError::NotFound { .. }) => {
            info!("{} already gone, nothing to reclaim", target);
            Ok(ExecutionOutcome::AlreadyGone)
        }
        Err(e) => Err(e),
    }
}

/// Build the warning event recorded against a scaled-down deployment. The
/// name carries a generated suffix so repeated scale-downs of the same
/// deployment never collide.
fn scaledown_event(target: &ReclaimTarget, window: &str) -> Event {
    let now = Time(Utc::now());
    Event {
        metadata: ObjectMeta {
            name: Some(format!("{}.{}", target.name, Uuid::new_v4().simple())),
            namespace: Some(target.namespace.clone()),
            ..Default::default()
        },
        involved_object: ObjectReference {
            api_version: Some("apps/v1".to_string()),
            kind: Some("Deployment".to_string()),
            name: Some(target.name.clone()),
            namespace: Some(target.namespace.clone()),
            uid: target.uid.clone(),
            ..Default::default()
        },
        reason: Some(SCALEDOWN_EVENT_REASON.to_string()),
        message: Some(format!(
            "Scaled deployment {} to 0 replicas: GPU utilization stayed at or below the idle threshold over the last {}",
            target.name, window
        )),
        type_: Some("Warning".to_string()),
        source: Some(EventSource {
            component: Some(COMPONENT.to_string()),
            ..Default::default()
        }),
        first_timestamp: Some(now.clone()),
        last_timestamp: Some(now),
        count: Some(1),
        ..Default::default()
    }
}
