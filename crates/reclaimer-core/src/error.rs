use miette::Diagnostic;
use thiserror::Error;

/// Core error type for reclaimer operations
#[derive(Error, Debug, Diagnostic)]
pub enum ReclaimerError {
    /// Required object metadata is absent
    #[error("Missing metadata field: {field}")]
    #[diagnostic(
        code(reclaimer::missing_metadata),
        help("The API server returned an object without a {field}; this object cannot be acted on")
    )]
    MissingMetadata { field: String },

    /// Forbid-label selector could not be parsed
    #[error("Invalid forbid-label selector: '{value}'")]
    #[diagnostic(
        code(reclaimer::invalid_label_selector),
        help("Use the form 'key=value', e.g. 'reclaim/forbid=true'")
    )]
    InvalidLabelSelector { value: String },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, ReclaimerError>;

impl ReclaimerError {
    /// Create a MissingMetadata error
    pub fn missing_metadata(field: impl Into<String>) -> Self {
        Self::MissingMetadata {
            field: field.into(),
        }
    }

    /// Create an InvalidLabelSelector error
    pub fn invalid_label_selector(value: impl Into<String>) -> Self {
        Self::InvalidLabelSelector {
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ReclaimerError::missing_metadata("name");
        assert!(matches!(err, ReclaimerError::MissingMetadata { .. }));

        let err = ReclaimerError::invalid_label_selector("no-equals-sign");
        assert!(matches!(err, ReclaimerError::InvalidLabelSelector { .. }));
    }
}
