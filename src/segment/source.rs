//! Token sources
//!
//! A token source yields the raw text of one streaming generation call in
//! arbitrary chunks. Chunk boundaries mean nothing; the sequence ends with
//! `None` after the last chunk, or with a single `Err`.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use super::error::SourceError;

/// Supplier of raw text chunks
pub trait TokenSource: Send + 'static {
    /// Wait for the next chunk
    fn next_chunk(&mut self) -> impl Future<Output = Option<Result<String, SourceError>>> + Send;
}

impl TokenSource for mpsc::Receiver<Result<String, SourceError>> {
    async fn next_chunk(&mut self) -> Option<Result<String, SourceError>> {
        self.recv().await
    }
}

/// Token source replaying a fixed list of chunks
///
/// Optionally ends with a failure instead of a normal completion, and can
/// pause before every chunk to imitate a slow upstream.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    chunks: VecDeque<String>,
    failure: Option<SourceError>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    /// Create a source yielding `chunks` in order
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            failure: None,
            delay: None,
        }
    }

    /// End with `error` after the last chunk
    pub fn fail_with(mut self, error: SourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Sleep for `delay` before yielding each chunk
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of chunks not yet yielded
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl TokenSource for ScriptedSource {
    async fn next_chunk(&mut self) -> Option<Result<String, SourceError>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.chunks.pop_front() {
            Some(chunk) => Some(Ok(chunk)),
            None => self.failure.take().map(Err),
        }
    }
}
