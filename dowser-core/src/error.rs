use crate::Error;
use thiserror::Error as ThisError;

/// Failure kinds surfaced by the data layer.
///
/// Every variant is fatal to the operation that raised it: the layer performs
/// no retries and no silent degradation. Errors travel inside [`crate::Error`]
/// and can be recovered with `downcast_ref::<DataError>()`.
#[derive(Debug, ThisError)]
pub enum DataError {
    /// Missing or ambiguous metadata: absent capability row, wrong key count.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Target table absent from the live schema.
    #[error("not found: {0}")]
    NotFound(String),
    /// Caller bug: entity lacking any key, invalid input.
    #[error("invalid argument: {0}")]
    Argument(String),
    /// Capability gap, not a transient condition.
    #[error("not supported: {0}")]
    NotSupported(String),
    /// Raised while executing against the backend or driving a lifecycle.
    #[error("execution error: {0}")]
    Execution(String),
}

impl DataError {
    pub fn configuration(message: impl Into<String>) -> Error {
        Error::new(DataError::Configuration(message.into()))
    }
    pub fn not_found(message: impl Into<String>) -> Error {
        Error::new(DataError::NotFound(message.into()))
    }
    pub fn argument(message: impl Into<String>) -> Error {
        Error::new(DataError::Argument(message.into()))
    }
    pub fn not_supported(message: impl Into<String>) -> Error {
        Error::new(DataError::NotSupported(message.into()))
    }
    pub fn execution(message: impl Into<String>) -> Error {
        Error::new(DataError::Execution(message.into()))
    }
}
