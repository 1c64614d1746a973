//! Caller-side job handles

use tokio::task::JoinHandle;

use crate::error::{Error, Result};

use super::broadcaster::SubscriberId;
use super::fragment::JobId;

/// Result of attaching a sink to a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// The sink received the replay and now gets live fragments
    Live(SubscriberId),
    /// The job had finished; this is its persisted content
    Finished(String),
    /// The sink failed during replay and will get nothing more
    Pruned {
        /// Fragments it accepted before failing
        delivered: usize,
    },
}

/// Handle to a running segmented stream
///
/// Dropping the handle does not stop the job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    task: JoinHandle<Result<String>>,
}

impl JobHandle {
    pub(super) fn new(id: JobId, task: JoinHandle<Result<String>>) -> Self {
        Self { id, task }
    }

    /// Get the job identifier
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Check if the job has stopped (finished, failed or aborted)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop pulling from the token source
    ///
    /// The job stays registered and unfinished; see
    /// [`JobRegistry::discard`](super::JobRegistry::discard).
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the job to end
    ///
    /// Returns the persisted content, or the error that ended the job.
    pub async fn wait(self) -> Result<String> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                if e.is_panic() {
                    tracing::error!(job = %self.id, "Job task panicked");
                }
                Err(Error::Aborted(self.id))
            }
        }
    }
}
