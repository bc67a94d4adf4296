use crate::error::{ReclaimerError, Result};
use crate::types::{OwnerKind, OwnerRef};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;

/// Point-in-time view of the pod fields the policy needs.
///
/// Extracted from a freshly read `Pod` each tick and discarded afterwards;
/// cluster state may change between ticks, so snapshots are never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct PodSnapshot {
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// The first owner reference, which is authoritative; further owners are
    /// never consulted
    pub owner: Option<OwnerRef>,
    pub node_selector: BTreeMap<String, String>,
    /// Whether at least one container is in the Running state
    pub container_running: bool,
    /// Start time of the earliest running container, when determinable
    pub started_at: Option<DateTime<Utc>>,
}

impl PodSnapshot {
    /// Extract a snapshot from a Pod object.
    ///
    /// Only missing identity (name/namespace) is an error. Missing status
    /// fields degrade to "not running" so that one malformed pod cannot
    /// abort a whole tick.
    pub fn from_pod(pod: &Pod) -> Result<Self> {
        let name = pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| ReclaimerError::missing_metadata("name"))?;
        let namespace = pod
            .metadata
            .namespace
            .clone()
            .ok_or_else(|| ReclaimerError::missing_metadata("namespace"))?;

        let owner = pod
            .metadata
            .owner_references
            .as_ref()
            .and_then(|refs| refs.first())
            .map(|r| OwnerRef {
                kind: OwnerKind::from_kind(&r.kind),
                name: r.name.clone(),
                uid: r.uid.clone(),
            });

        let node_selector = pod
            .spec
            .as_ref()
            .and_then(|s| s.node_selector.clone())
            .unwrap_or_default();

        let (container_running, started_at) = running_state(pod);

        Ok(Self {
            name,
            namespace,
            uid: pod.metadata.uid.clone(),
            labels: pod.metadata.labels.clone().unwrap_or_default(),
            owner,
            node_selector,
            container_running,
            started_at,
        })
    }
}

/// Determine whether any container is running and when the earliest running
/// container started
fn running_state(pod: &Pod) -> (bool, Option<DateTime<Utc>>) {
    let statuses = match pod.status.as_ref().and_then(|s| s.container_statuses.as_ref()) {
        Some(s) => s,
        None => return (false, None),
    };

    let mut running = false;
    let mut earliest: Option<DateTime<Utc>> = None;

    for status in statuses {
        let started = match status.state.as_ref().and_then(|s| s.running.as_ref()) {
            Some(r) => r.started_at.as_ref().map(|t| t.0),
            None => continue,
        };
        running = true;
        earliest = match (earliest, started) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (None, t) => t,
            (t, None) => t,
        };
    }

    (running, earliest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateWaiting, ContainerStatus, PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};

    fn base_pod(name: &str, namespace: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                uid: Some("pod-uid-1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn running_status(started_at: Option<DateTime<Utc>>) -> ContainerStatus {
        ContainerStatus {
            name: "main".to_string(),
            state: Some(ContainerState {
                running: Some(ContainerStateRunning {
                    started_at: started_at.map(Time),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_requires_identity() {
        let mut pod = base_pod("gpu-pod", "ml");
        pod.metadata.namespace = None;

        let result = PodSnapshot::from_pod(&pod);
        assert!(matches!(
            result,
            Err(ReclaimerError::MissingMetadata { .. })
        ));
    }

    #[test]
    fn test_snapshot_takes_first_owner_reference() {
        let mut pod = base_pod("gpu-pod", "ml");
        pod.metadata.owner_references = Some(vec![
            OwnerReference {
                kind: "ReplicaSet".to_string(),
                name: "rs-a".to_string(),
                uid: "rs-uid".to_string(),
                ..Default::default()
            },
            OwnerReference {
                kind: "Job".to_string(),
                name: "job-b".to_string(),
                uid: "job-uid".to_string(),
                ..Default::default()
            },
        ]);

        let snapshot = PodSnapshot::from_pod(&pod).unwrap();
        let owner = snapshot.owner.unwrap();
        assert_eq!(owner.kind, OwnerKind::ReplicaSet);
        assert_eq!(owner.name, "rs-a");
    }

    #[test]
    fn test_snapshot_without_status_is_not_running() {
        let pod = base_pod("gpu-pod", "ml");

        let snapshot = PodSnapshot::from_pod(&pod).unwrap();
        assert!(!snapshot.container_running);
        assert!(snapshot.started_at.is_none());
    }

    #[test]
    fn test_snapshot_waiting_container_is_not_running() {
        let mut pod = base_pod("gpu-pod", "ml");
        pod.status = Some(PodStatus {
            container_statuses: Some(vec![ContainerStatus {
                name: "main".to_string(),
                state: Some(ContainerState {
                    waiting: Some(ContainerStateWaiting::default()),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        });

        let snapshot = PodSnapshot::from_pod(&pod).unwrap();
        assert!(!snapshot.container_running);
    }

    #[test]
    fn test_snapshot_earliest_running_start_wins() {
        let early = Utc::now() - chrono::Duration::hours(3);
        let late = Utc::now() - chrono::Duration::hours(1);

        let mut pod = base_pod("gpu-pod", "ml");
        pod.status = Some(PodStatus {
            container_statuses: Some(vec![
                running_status(Some(late)),
                running_status(Some(early)),
            ]),
            ..Default::default()
        });

        let snapshot = PodSnapshot::from_pod(&pod).unwrap();
        assert!(snapshot.container_running);
        assert_eq!(snapshot.started_at, Some(early));
    }

    #[test]
    fn test_snapshot_running_without_timestamp() {
        let mut pod = base_pod("gpu-pod", "ml");
        pod.status = Some(PodStatus {
            container_statuses: Some(vec![running_status(None)]),
            ..Default::default()
        });

        let snapshot = PodSnapshot::from_pod(&pod).unwrap();
        assert!(snapshot.container_running);
        assert!(snapshot.started_at.is_none());
    }
}
