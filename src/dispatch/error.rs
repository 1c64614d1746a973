//! Dispatch error types

/// Error settling a dispatched job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The executor reported a failure
    Executor(String),
    /// The job ended without producing a result (executor panicked)
    Abandoned,
}

impl JobError {
    /// Create an executor failure
    pub fn executor(reason: impl Into<String>) -> Self {
        JobError::Executor(reason.into())
    }
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::Executor(reason) => write!(f, "Job failed: {}", reason),
            JobError::Abandoned => write!(f, "Job abandoned before settling"),
        }
    }
}

impl std::error::Error for JobError {}
