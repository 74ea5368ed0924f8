//! Crate-level error taxonomy shared by every subsystem, matching the
//! disposition table in SPEC_FULL.md §7. Each variant is either retriable
//! (the pipeline schedules another attempt with backoff) or terminal (the
//! job is written `failed` immediately).

use thiserror::Error;

/// The unified error kind for job execution failures, spanning agent
/// validation, provider transport, and scheduler claim semantics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    /// `submit` referenced an agent name not present in the agent registry.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// The agent rejected its payload against its declared schema.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The agent's `execute` panicked or otherwise crashed.
    #[error("agent crashed: {0}")]
    AgentCrashed(String),

    /// A provider rejected credentials.
    #[error("provider auth failure: {0}")]
    AuthFailure(String),

    /// A provider rejected the request as malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A provider reported rate limiting. Retriable.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A provider or store call exceeded its deadline. Retriable.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A provider failed for a reason that isn't one of the above. Retriable.
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// `submit` was rejected because the ready queue is at capacity.
    #[error("queue full")]
    QueueFull,

    /// A schedule's cron expression or timezone failed to parse.
    #[error("invalid cron: {0}")]
    InvalidCron(String),

    /// A scheduler's conditional claim update affected zero rows — another
    /// scheduler instance already claimed this firing. Not a failure; the
    /// sweep silently moves on.
    #[error("claim lost for schedule {0}")]
    ClaimLost(String),

    /// The requesting user does not own the referenced job or schedule.
    #[error("access denied")]
    AccessDenied,

    /// The referenced job or schedule does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A provider name was requested that the registry has no handle for.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A lower-level store error that doesn't map onto a more specific kind.
    #[error("store error: {0}")]
    Store(String),

    /// An internal error described by a plain message.
    #[error("{0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the pipeline should schedule another attempt for a job that
    /// failed with this error, per the disposition table in SPEC_FULL.md §7.
    /// This is a method, not a parallel lookup table, so disposition cannot
    /// drift from the variant that carries it.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            CoreError::RateLimited(_) | CoreError::Timeout(_) | CoreError::UpstreamError(_)
        )
    }

    /// A short, stable tag used in job `error` columns and log fields, kept
    /// distinct from the human-readable `Display` message.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::UnknownAgent(_) => "UnknownAgent",
            CoreError::InvalidPayload(_) => "InvalidPayload",
            CoreError::AgentCrashed(_) => "AgentCrashed",
            CoreError::AuthFailure(_) => "AuthFailure",
            CoreError::InvalidRequest(_) => "InvalidRequest",
            CoreError::RateLimited(_) => "RateLimited",
            CoreError::Timeout(_) => "Timeout",
            CoreError::UpstreamError(_) => "UpstreamError",
            CoreError::QueueFull => "QueueFull",
            CoreError::InvalidCron(_) => "InvalidCron",
            CoreError::ClaimLost(_) => "ClaimLost",
            CoreError::AccessDenied => "AccessDenied",
            CoreError::NotFound(_) => "NotFound",
            CoreError::ProviderUnavailable(_) => "ProviderUnavailable",
            CoreError::Store(_) => "Store",
            CoreError::Internal(_) => "Internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_kinds_match_disposition_table() {
        assert!(CoreError::RateLimited("x".into()).is_retriable());
        assert!(CoreError::Timeout("x".into()).is_retriable());
        assert!(CoreError::UpstreamError("x".into()).is_retriable());
    }

    #[test]
    fn non_retriable_kinds_match_disposition_table() {
        assert!(!CoreError::UnknownAgent("x".into()).is_retriable());
        assert!(!CoreError::InvalidPayload("x".into()).is_retriable());
        assert!(!CoreError::AgentCrashed("x".into()).is_retriable());
        assert!(!CoreError::AuthFailure("x".into()).is_retriable());
        assert!(!CoreError::InvalidRequest("x".into()).is_retriable());
    }

    #[test]
    fn kind_tag_is_stable_and_distinct_from_display() {
        let err = CoreError::RateLimited("too many requests".into());
        assert_eq!(err.kind(), "RateLimited");
        assert!(err.to_string().contains("too many requests"));
    }
}
