use crate::error::{Result, RuntimeError};
use crate::traits::Orchestrator;
use reclaimer_core::{OwnerKind, PodSnapshot, ReclaimAction, ReclaimTarget, TargetKind};
use tracing::debug;

/// Walk the controller-owner chain to the object reclamation must act on.
///
/// Deleting a ReplicaSet-owned pod would only get it recreated; the
/// reclamation has to land on the controller that owns the replica count,
/// which for a ReplicaSet means its Deployment. Resolution only reads
/// cluster state, never mutates it.
pub async fn resolve(
    orchestrator: &dyn Orchestrator,
    snapshot: &PodSnapshot,
) -> Result<ReclaimAction> {
    let owner = match &snapshot.owner {
        // Bare pod: delete it directly
        None => {
            return Ok(ReclaimAction::DeletePod(ReclaimTarget::new(
                TargetKind::Pod,
                &snapshot.name,
                &snapshot.namespace,
                snapshot.uid.clone(),
            )))
        }
        Some(owner) => owner,
    };

    match &owner.kind {
        // Jobs have no replica concept to zero out; they are deleted
        OwnerKind::Job => Ok(ReclaimAction::DeleteJob(ReclaimTarget::new(
            TargetKind::Job,
            &owner.name,
            &snapshot.namespace,
            Some(owner.uid.clone()),
        ))),
        OwnerKind::ReplicaSet => {
            debug!(
                "Resolving deployment owning replicaset {}/{}",
                snapshot.namespace, owner.name
            );
            let rs = orchestrator
                .get_replica_set(&snapshot.namespace, &owner.name)
                .await
                .map_err(|e| match e {
                    RuntimeError::NotFound { .. } => RuntimeError::unresolvable_owner(
                        format!("{}/{}", snapshot.namespace, snapshot.name),
                        format!("owning replicaset {} no longer exists", owner.name),
                    ),
                    other => other,
                })?;

            let rs_owner = rs
                .metadata
                .owner_references
                .as_ref()
                .and_then(|refs| refs.first());

            match rs_owner {
                Some(r) if r.kind == "Deployment" => {
                    Ok(ReclaimAction::ScaleDownDeployment(ReclaimTarget::new(
                        TargetKind::Deployment,
                        &r.name,
                        &snapshot.namespace,
                        Some(r.uid.clone()),
                    )))
                }
                Some(r) => Err(RuntimeError::unresolvable_owner(
                    format!("{}/{}", snapshot.namespace, snapshot.name),
                    format!(
                        "replicaset {} is owned by a {}, not a Deployment",
                        owner.name, r.kind
                    ),
                )),
                None => Err(RuntimeError::unresolvable_owner(
                    format!("{}/{}", snapshot.namespace, snapshot.name),
                    format!("replicaset {} has no owner reference", owner.name),
                )),
            }
        }
        // Never guess a destructive action for an unknown controller shape
        OwnerKind::Other(kind) => Err(RuntimeError::unresolvable_owner(
            format!("{}/{}", snapshot.namespace, snapshot.name),
            format!("unrecognized controller kind {}", kind),
        )),
    }
}
