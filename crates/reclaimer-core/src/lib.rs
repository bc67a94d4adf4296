//! Reclaimer Core - Fundamental types for the GPU reclamation controller
//!
//! This crate provides:
//! - The data model shared by the policy, metrics, and runtime crates
//! - Pod snapshot extraction from Kubernetes objects
//! - Policy configuration with parsing helpers
//! - Error types with miette diagnostics

pub mod config;
pub mod error;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use config::PolicyConfig;
pub use error::{ReclaimerError, Result};
pub use snapshot::PodSnapshot;
pub use types::{
    Decision, OwnerKind, OwnerRef, ReclaimAction, ReclaimTarget, SkipReason, TargetKind,
    UtilizationSample,
};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::apps::v1::ReplicaSet;
pub use k8s_openapi::api::core::v1::{Event, Pod};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
