use miette::Diagnostic;
use thiserror::Error;

/// Runtime error type for orchestrator access and reclamation execution
#[derive(Error, Debug, Diagnostic)]
pub enum RuntimeError {
    /// The target object does not exist. Execution treats this as
    /// success-equivalent: the desired end state (resource reclaimed)
    /// already holds.
    #[error("{kind} not found: {name}")]
    #[diagnostic(
        code(reclaimer::runtime::not_found),
        help("The object may have been deleted by a concurrent actor; no retry is needed")
    )]
    NotFound { kind: String, name: String },

    /// The orchestrator rejected the request
    #[error("API request failed with status {status}: {message}")]
    #[diagnostic(
        code(reclaimer::runtime::api_error),
        help("Check RBAC permissions for the reclaimer service account and the object's current state")
    )]
    ApiError { status: u16, message: String },

    /// The orchestrator could not be reached or did not answer in time
    #[error("Request failed: {message}")]
    #[diagnostic(
        code(reclaimer::runtime::request_failed),
        help("Check the API server URL and network path; the candidate is retried next tick")
    )]
    RequestFailed { message: String },

    /// The owner chain does not lead to a controller this system knows how
    /// to reclaim
    #[error("Cannot resolve a reclaim target for pod {pod}: {detail}")]
    #[diagnostic(
        code(reclaimer::runtime::unresolvable_owner),
        help("Only bare pods, Job-owned pods, and Deployment-owned pods are reclaimed; anything else is skipped")
    )]
    UnresolvableOwner { pod: String, detail: String },

    /// Invalid client configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(reclaimer::runtime::invalid_config), help("{suggestion}"))]
    InvalidConfig { message: String, suggestion: String },

    /// Core library error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] reclaimer_core::ReclaimerError),

    /// Metrics backend error (aborts the tick, never the process)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Metrics(#[from] reclaimer_metrics::MetricsError),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

impl RuntimeError {
    /// Create a NotFound error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an ApiError
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Create a RequestFailed error
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::RequestFailed {
            message: message.into(),
        }
    }

    /// Create an UnresolvableOwner error
    pub fn unresolvable_owner(pod: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnresolvableOwner {
            pod: pod.into(),
            detail: detail.into(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Whether this error means the target object no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
