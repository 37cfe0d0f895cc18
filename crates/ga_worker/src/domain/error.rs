use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// The user-lookup collaborator returned an error status. Unlike per-hit
/// failures this aborts the enclosing dispatch.
#[derive(Debug, Error)]
#[error("user lookup failed: {0}")]
pub struct LookupError(#[from] pub anyhow::Error);

/// A single outbound analytics hit was rejected. Always caught and logged at
/// the sending loop, never propagated.
#[derive(Debug, Error)]
#[error("analytics hit failed: {0}")]
pub struct SendError(#[from] pub anyhow::Error);

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    UserLookup(#[from] LookupError),

    #[error("invalid message payload: {0}")]
    InvalidMessage(String),
}
