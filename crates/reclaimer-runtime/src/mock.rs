use crate::error::{Result, RuntimeError};
use crate::traits::Orchestrator;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::{Event, Pod};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

type Key = (String, String);

#[derive(Default)]
struct MockState {
    pods: HashMap<Key, Pod>,
    replica_sets: HashMap<Key, ReplicaSet>,
    deployments: HashMap<Key, i32>,
    jobs: HashSet<Key>,
    events: Vec<Event>,
    failing_pod_reads: HashSet<Key>,
    calls: Vec<String>,
}

/// In-memory orchestrator for tests.
///
/// Maintains a registry of pods, replicasets, deployments (by replica
/// count), and jobs, records every call for assertions, and can be told to
/// fail specific pod reads to exercise per-candidate isolation.
#[derive(Default)]
pub struct MockOrchestrator {
    state: RwLock<MockState>,
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

impl MockOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_pod(&self, pod: Pod) {
        let k = key(
            pod.metadata.namespace.as_deref().unwrap_or_default(),
            pod.metadata.name.as_deref().unwrap_or_default(),
        );
        self.state.write().await.pods.insert(k, pod);
    }

    pub async fn add_replica_set(&self, rs: ReplicaSet) {
        let k = key(
            rs.metadata.namespace.as_deref().unwrap_or_default(),
            rs.metadata.name.as_deref().unwrap_or_default(),
        );
        self.state.write().await.replica_sets.insert(k, rs);
    }

    pub async fn add_deployment(&self, namespace: &str, name: &str, replicas: i32) {
        self.state
            .write()
            .await
            .deployments
            .insert(key(namespace, name), replicas);
    }

    pub async fn add_job(&self, namespace: &str, name: &str) {
        self.state.write().await.jobs.insert(key(namespace, name));
    }

    /// Make get_pod fail with a transport-class error for this pod
    pub async fn fail_pod_read(&self, namespace: &str, name: &str) {
        self.state
            .write()
            .await
            .failing_pod_reads
            .insert(key(namespace, name));
    }

    pub async fn pod_exists(&self, namespace: &str, name: &str) -> bool {
        self.state
            .read()
            .await
            .pods
            .contains_key(&key(namespace, name))
    }

    pub async fn job_exists(&self, namespace: &str, name: &str) -> bool {
        self.state
            .read()
            .await
            .jobs
            .contains(&key(namespace, name))
    }

    pub async fn replica_set_exists(&self, namespace: &str, name: &str) -> bool {
        self.state
            .read()
            .await
            .replica_sets
            .contains_key(&key(namespace, name))
    }

    pub async fn deployment_replicas(&self, namespace: &str, name: &str) -> Option<i32> {
        self.state
            .read()
            .await
            .deployments
            .get(&key(namespace, name))
            .copied()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.state.read().await.events.clone()
    }

    pub async fn calls(&self) -> Vec<String> {
        self.state.read().await.calls.clone()
    }

    async fn record(&self, call: String) {
        debug!("Mock orchestrator: {}", call);
        self.state.write().await.calls.push(call);
    }
}

#[async_trait]
impl Orchestrator for MockOrchestrator {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.record(format!("get_pod {}/{}", namespace, name)).await;

        let state = self.state.read().await;
        if state.failing_pod_reads.contains(&key(namespace, name)) {
            return Err(RuntimeError::request_failed("injected pod read failure"));
        }
        state
            .pods
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| RuntimeError::not_found("Pod", name))
    }

    async fn get_replica_set(&self, namespace: &str, name: &str) -> Result<ReplicaSet> {
        self.record(format!("get_replica_set {}/{}", namespace, name))
            .await;

        self.state
            .read()
            .await
            .replica_sets
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| RuntimeError::not_found("ReplicaSet", name))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        self.record(format!("delete_pod {}/{}", namespace, name))
            .await;

        match self.state.write().await.pods.remove(&key(namespace, name)) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::not_found("Pod", name)),
        }
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        self.record(format!("delete_job {}/{}", namespace, name))
            .await;

        if self.state.write().await.jobs.remove(&key(namespace, name)) {
            Ok(())
        } else {
            Err(RuntimeError::not_found("Job", name))
        }
    }

    async fn scale_deployment(&self, namespace: &str, name: &str, replicas: i32) -> Result<()> {
        self.record(format!(
            "scale_deployment {}/{} to {}",
            namespace, name, replicas
        ))
        .await;

        match self
            .state
            .write()
            .await
            .deployments
            .get_mut(&key(namespace, name))
        {
            Some(current) => {
                *current = replicas;
                Ok(())
            }
            None => Err(RuntimeError::not_found("Deployment", name)),
        }
    }

    async fn create_event(&self, namespace: &str, event: &Event) -> Result<()> {
        self.record(format!("create_event {}", namespace)).await;
        self.state.write().await.events.push(event.clone());
        Ok(())
    }
}
