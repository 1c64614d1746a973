//! Registry error types
//!
//! Error types for job registry and subscriber delivery.

use super::fragment::JobId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Job not found (never created, failed, or discarded)
    JobNotFound(JobId),
    /// Job no longer accepts fragments
    JobClosed(JobId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::JobNotFound(id) => write!(f, "Job not found: {}", id),
            RegistryError::JobClosed(id) => write!(f, "Job is closed: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}

/// A sink failed to accept a delivery
///
/// Never surfaced to the producer: the broadcaster drops the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The receiving side went away
    Closed,
    /// The receiving side is not keeping up
    Full,
    /// The sink refused the delivery
    Rejected(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Closed => write!(f, "Sink closed"),
            SinkError::Full => write!(f, "Sink full"),
            SinkError::Rejected(reason) => write!(f, "Sink rejected delivery: {}", reason),
        }
    }
}

impl std::error::Error for SinkError {}
