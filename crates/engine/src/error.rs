use thiserror::Error;

use crate::client::error::RuntimeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Stable code the controller layer attaches to its error responses.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Configuration(_) => "CONFIGURATION_ERROR",
            EngineError::Connectivity(_) => "CONNECTIVITY_ERROR",
            EngineError::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            EngineError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        EngineError::NotFound(format!("{} {}", what, id))
    }
}

impl From<RuntimeError> for EngineError {
    fn from(err: RuntimeError) -> Self {
        EngineError::Connectivity(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(EngineError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(EngineError::Configuration("x".into()).code(), "CONFIGURATION_ERROR");
        assert_eq!(EngineError::Connectivity("x".into()).code(), "CONNECTIVITY_ERROR");
        assert_eq!(EngineError::UnsupportedOperation("x".into()).code(), "UNSUPPORTED_OPERATION");
        assert_eq!(EngineError::Storage("x".into()).code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_runtime_error_becomes_connectivity_with_message() {
        let err: EngineError = RuntimeError::ConnectionFailed("connection refused".into()).into();
        match err {
            EngineError::Connectivity(msg) => assert!(msg.contains("connection refused")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
