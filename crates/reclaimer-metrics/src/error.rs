use miette::Diagnostic;
use thiserror::Error;

/// Metrics backend error type
#[derive(Error, Debug, Diagnostic)]
pub enum MetricsError {
    /// The backend could not be reached or did not answer in time
    #[error("Metrics backend unavailable: {message}")]
    #[diagnostic(
        code(reclaimer::metrics::backend_unavailable),
        help("Check the Prometheus URL and network path; the tick will be retried at the next interval")
    )]
    BackendUnavailable { message: String },

    /// The backend answered with something other than a well-formed
    /// instant-vector result
    #[error("Bad metrics response: {message}")]
    #[diagnostic(
        code(reclaimer::metrics::bad_response),
        help("Verify the query returns an instant vector and the backend speaks the Prometheus HTTP API")
    )]
    BadResponse { message: String },

    /// Sampler configuration was rejected at construction
    #[error("Invalid metrics configuration: {message}")]
    #[diagnostic(
        code(reclaimer::metrics::invalid_config),
        help("{suggestion}")
    )]
    InvalidConfig { message: String, suggestion: String },
}

/// Result type for metrics operations
pub type Result<T> = std::result::Result<T, MetricsError>;

impl MetricsError {
    /// Create a BackendUnavailable error
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Create a BadResponse error
    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::BadResponse {
            message: message.into(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}
