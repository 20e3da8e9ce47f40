use thiserror::Error;

/// Engine-wide error taxonomy.
///
/// `Validation` and `ExternalService` are recovered inside the classifier
/// and matcher (fallback/degradation); everything else fails closed and is
/// surfaced to the caller.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("conflicting issue creation for tenant {tenant_id}")]
    Conflict { tenant_id: i64 },

    #[error("deadline exceeded before the report could be processed")]
    Cancelled,

    #[error("store failure: {0}")]
    Store(String),
}

impl EngineError {
    pub fn validation(detail: impl Into<String>) -> Self {
        EngineError::Validation(detail.into())
    }

    pub fn external(detail: impl Into<String>) -> Self {
        EngineError::ExternalService(detail.into())
    }

    pub fn not_found(kind: &'static str, id: i64) -> Self {
        EngineError::NotFound { kind, id }
    }

    /// Only external-service failures are worth retrying; a malformed
    /// response stays malformed no matter how often it is requested.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::ExternalService(_))
    }
}
