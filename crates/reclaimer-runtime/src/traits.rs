use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::{Event, Pod};

/// Trait for orchestrator access.
///
/// This abstracts the Kubernetes API operations the reclaimer needs: reads
/// for snapshotting and ownership resolution, and the three reclamation
/// writes plus audit-event creation. All operations are namespace-scoped and
/// must report "not found" as a distinguishable error so execution can treat
/// a vanished target as already reclaimed. It enables testing via
/// `MockOrchestrator`.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    // --- Reads ---

    /// Read a pod's current metadata/spec/status
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;

    /// Read a ReplicaSet, used to walk the owner chain up to a Deployment
    async fn get_replica_set(&self, namespace: &str, name: &str) -> Result<ReplicaSet>;

    // --- Reclamation writes ---

    /// Delete a bare pod
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;

    /// Delete a Job, letting the orchestrator's garbage collection remove
    /// its dependent pods
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;

    /// Patch a Deployment's replica count
    async fn scale_deployment(&self, namespace: &str, name: &str, replicas: i32) -> Result<()>;

    /// Record an audit event in the given namespace
    async fn create_event(&self, namespace: &str, event: &Event) -> Result<()>;
}
