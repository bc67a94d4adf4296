use serde::{Deserialize, Serialize};
use std::fmt;

/// Windowed-average GPU utilization for one pod, as reported by the metrics
/// backend. Produced fresh each tick and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSample {
    /// Pod name from the `pod` series label
    pub pod_name: String,
    /// Namespace from the `namespace` series label
    pub namespace: String,
    /// Optional accelerator identifier when the query groups by accelerator
    pub accelerator_id: Option<String>,
    /// Average utilization over the window, in [0, 1]
    pub average_utilization: f64,
    /// The averaging window as a PromQL range string (e.g. "1h")
    pub window: String,
}

/// Controller kind of a pod's first owner reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerKind {
    ReplicaSet,
    Job,
    /// Any controller kind this system does not know how to reclaim
    Other(String),
}

impl OwnerKind {
    /// Map a Kubernetes ownerReference kind string
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "ReplicaSet" => Self::ReplicaSet,
            "Job" => Self::Job,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReplicaSet => write!(f, "ReplicaSet"),
            Self::Job => write!(f, "Job"),
            Self::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// The authoritative (first) owner reference of a pod.
///
/// The namespace is always inherited from the pod; Kubernetes owner
/// references never cross namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub name: String,
    pub uid: String,
}

/// Kind of object a reclamation acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Pod,
    Job,
    Deployment,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pod => write!(f, "Pod"),
            Self::Job => write!(f, "Job"),
            Self::Deployment => write!(f, "Deployment"),
        }
    }
}

/// The concrete object a reclamation action is issued against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimTarget {
    pub kind: TargetKind,
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
}

impl ReclaimTarget {
    pub fn new(
        kind: TargetKind,
        name: impl Into<String>,
        namespace: impl Into<String>,
        uid: Option<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
            uid,
        }
    }
}

impl fmt::Display for ReclaimTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Why a candidate was left alone this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The pod carries the configured forbid label
    ProtectedByLabel,
    /// Average utilization was strictly above the threshold
    ActivelyUsed,
    /// The pod's node selector names an exempt accelerator type
    ExemptAcceleratorType,
    /// No running container state (pending, crash-looping, or terminated)
    NotRunning,
    /// The pod has not been running for the minimum runtime yet
    WithinGracePeriod,
    /// The owner chain does not lead to a known reclaimable controller
    UnresolvableOwner,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtectedByLabel => write!(f, "ProtectedByLabel"),
            Self::ActivelyUsed => write!(f, "ActivelyUsed"),
            Self::ExemptAcceleratorType => write!(f, "ExemptAcceleratorType"),
            Self::NotRunning => write!(f, "NotRunning"),
            Self::WithinGracePeriod => write!(f, "WithinGracePeriod"),
            Self::UnresolvableOwner => write!(f, "UnresolvableOwner"),
        }
    }
}

/// A reclamation side effect together with its target.
///
/// Which variant applies is decided by ownership shape, not by the policy
/// evaluator: bare pods are deleted directly, Job-owned pods are reclaimed by
/// deleting the Job, and Deployment-owned pods by scaling the Deployment to
/// zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReclaimAction {
    DeletePod(ReclaimTarget),
    DeleteJob(ReclaimTarget),
    ScaleDownDeployment(ReclaimTarget),
}

impl ReclaimAction {
    /// The object this action is issued against
    pub fn target(&self) -> &ReclaimTarget {
        match self {
            Self::DeletePod(t) | Self::DeleteJob(t) | Self::ScaleDownDeployment(t) => t,
        }
    }
}

impl fmt::Display for ReclaimAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeletePod(t) => write!(f, "delete {}", t),
            Self::DeleteJob(t) => write!(f, "delete {}", t),
            Self::ScaleDownDeployment(t) => write!(f, "scale {} to 0 replicas", t),
        }
    }
}

/// The outcome of evaluating and resolving one candidate.
///
/// A target is only ever present on the `Reclaim` side; the skip side carries
/// the reason instead. Computed once per candidate per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Skip(SkipReason),
    Reclaim(ReclaimAction),
}
