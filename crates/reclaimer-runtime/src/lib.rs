//! Reclaimer Runtime - Orchestrator access and reclamation execution
//!
//! This crate provides:
//! - The `Orchestrator` trait over the Kubernetes operations the reclaimer
//!   needs, with an HTTP implementation and an in-memory mock
//! - Ownership resolution from a pod to the controller object to act on
//! - Idempotent-tolerant execution of reclamation actions
//! - The tick-driven reclamation controller loop

pub mod api_client;
pub mod controller;
pub mod error;
pub mod executor;
pub mod mock;
pub mod resolver;
pub mod traits;

// Re-export commonly used types
pub use api_client::KubeApiClient;
pub use controller::{
    CandidateOutcome, ControllerConfig, FailureStage, ReclaimController, TickSummary,
};
pub use error::{Result, RuntimeError};
pub use executor::{execute, ExecutionOutcome, SCALEDOWN_EVENT_REASON};
pub use mock::MockOrchestrator;
pub use resolver::resolve;
pub use traits::Orchestrator;
