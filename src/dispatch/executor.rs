//! Job executors
//!
//! An executor is the external call a dispatched job waits on, such as an
//! image generation request. It gets one input, may fail, and is never
//! retried by the dispatcher.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use bytes::Bytes;

use super::error::JobError;

/// Async work run by a [`JobDispatcher`](super::JobDispatcher)
pub trait JobExecutor: Send + Sync + 'static {
    /// What a job is submitted with
    type Input: Send + 'static;
    /// What a successful job settles with
    type Output: Send + 'static;

    /// Run one job
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = Result<Self::Output, JobError>> + Send;
}

/// Executor backed by an async closure
pub struct FnExecutor<F, I> {
    f: F,
    _input: PhantomData<fn(I)>,
}

impl<F, I> FnExecutor<F, I> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _input: PhantomData,
        }
    }
}

impl<F, I, Fut, O> JobExecutor for FnExecutor<F, I>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, JobError>> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn execute(&self, input: I) -> impl Future<Output = Result<O, JobError>> + Send {
        (self.f)(input)
    }
}

/// Stand-in painter for running without an image provider
///
/// Waits for `delay`, then returns the upper-cased prompt as the image
/// payload. Empty prompts are rejected.
#[derive(Debug, Clone)]
pub struct StubPainter {
    delay: Duration,
}

impl StubPainter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for StubPainter {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl JobExecutor for StubPainter {
    type Input = String;
    type Output = Bytes;

    async fn execute(&self, prompt: String) -> Result<Bytes, JobError> {
        tokio::time::sleep(self.delay).await;

        if prompt.trim().is_empty() {
            return Err(JobError::executor("empty prompt"));
        }
        Ok(Bytes::from(prompt.to_uppercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stub_painter() {
        let painter = StubPainter::default();
        let start = tokio::time::Instant::now();

        let image = painter.execute("a fox at a lectern".to_string()).await.unwrap();
        assert_eq!(image, Bytes::from_static(b"A FOX AT A LECTERN"));
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        assert_eq!(
            painter.execute("  ".to_string()).await,
            Err(JobError::executor("empty prompt"))
        );
    }

    #[tokio::test]
    async fn test_fn_executor() {
        let doubler = FnExecutor::new(|n: u32| async move {
            if n == 0 {
                Err(JobError::executor("zero"))
            } else {
                Ok(n * 2)
            }
        });

        assert_eq!(doubler.execute(21).await, Ok(42));
        assert_eq!(doubler.execute(0).await, Err(JobError::executor("zero")));
    }
}
