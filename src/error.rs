//! Crate-level error type

use crate::dispatch::JobError;
use crate::pages::ShapeError;
use crate::persist::StoreError;
use crate::registry::{JobId, RegistryError};
use crate::segment::{SegmentError, SourceError};

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure reported to the owner of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The token source failed
    Source(SourceError),
    /// Upstream text had the wrong shape
    Malformed(ShapeError),
    /// A dispatched job failed
    Job(JobError),
    /// Registry lookup or state error
    Registry(RegistryError),
    /// The persistence collaborator failed
    Store(StoreError),
    /// The job's task was aborted before it finished
    Aborted(JobId),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Source(e) => write!(f, "{}", e),
            Error::Malformed(e) => write!(f, "{}", e),
            Error::Job(e) => write!(f, "{}", e),
            Error::Registry(e) => write!(f, "{}", e),
            Error::Store(e) => write!(f, "{}", e),
            Error::Aborted(id) => write!(f, "Job aborted: {}", id),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Source(e) => Some(e),
            Error::Malformed(e) => Some(e),
            Error::Job(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Store(e) => Some(e),
            Error::Aborted(_) => None,
        }
    }
}

impl From<SourceError> for Error {
    fn from(e: SourceError) -> Self {
        Error::Source(e)
    }
}

impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Malformed(e)
    }
}

impl From<SegmentError> for Error {
    fn from(e: SegmentError) -> Self {
        match e {
            SegmentError::Source(e) => Error::Source(e),
            SegmentError::Malformed(e) => Error::Malformed(e),
        }
    }
}

impl From<JobError> for Error {
    fn from(e: JobError) -> Self {
        Error::Job(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}
