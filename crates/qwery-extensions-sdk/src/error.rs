//! Driver error types.

/// Errors raised by driver factories and driver instances.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The connection could not be established or verified.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A query was rejected or failed mid-execution.
    #[error("query failed: {0}")]
    Query(String),

    /// Metadata introspection failed.
    #[error("metadata introspection failed: {0}")]
    Metadata(String),

    /// The provider-specific configuration was rejected by the driver.
    #[error("invalid driver config: {0}")]
    InvalidConfig(String),

    /// Anything else a driver implementation needs to surface.
    #[error("driver error: {0}")]
    Other(String),
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
