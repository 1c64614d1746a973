//! Lazy fragment streams
//!
//! [`open`] runs a [`Segmenter`] over a [`TokenSource`] in its own task and
//! hands the fragments to the consumer over a bounded channel. The task
//! suspends on the source between chunks and on the channel when the
//! consumer lags behind. Once the consumer is gone the task stops and drops
//! the source, even while it is waiting for a chunk.

use tokio::sync::mpsc;

use crate::registry::Fragment;

use super::config::SegmenterConfig;
use super::error::SegmentError;
use super::segmenter::Segmenter;
use super::source::TokenSource;

/// Consumer side of a segmented token source
///
/// Yields fragments in order. The last item is an `Err` if the source failed
/// or the page count did not match; otherwise the stream simply ends.
pub struct FragmentStream {
    rx: mpsc::Receiver<Result<Fragment, SegmentError>>,
}

impl FragmentStream {
    /// Wait for the next fragment
    pub async fn next(&mut self) -> Option<Result<Fragment, SegmentError>> {
        self.rx.recv().await
    }

    /// Drain the stream, returning every fragment or the terminal error
    pub async fn collect(mut self) -> Result<Vec<Fragment>, SegmentError> {
        let mut fragments = Vec::new();
        while let Some(item) = self.next().await {
            fragments.push(item?);
        }
        Ok(fragments)
    }
}

/// Start segmenting `source`
///
/// Consumption begins immediately on a spawned task, so this must be called
/// from within a tokio runtime. Dropping the returned stream stops the task
/// and releases `source`.
pub fn open<T: TokenSource>(source: T, config: SegmenterConfig) -> FragmentStream {
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    tokio::spawn(run(source, Segmenter::new(config), tx));
    FragmentStream { rx }
}

async fn run<T: TokenSource>(
    mut source: T,
    mut segmenter: Segmenter,
    tx: mpsc::Sender<Result<Fragment, SegmentError>>,
) {
    let mut chunks = 0u64;

    loop {
        let next = tokio::select! {
            next = source.next_chunk() => next,
            _ = tx.closed() => {
                tracing::debug!(chunks = chunks, "Fragment consumer dropped, releasing source");
                return;
            }
        };
        let Some(chunk) = next else {
            break;
        };

        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(chunks = chunks, error = %e, "Token source failed");
                // Anything still held in the segmenter is dropped with it
                let _ = tx.send(Err(SegmentError::Source(e))).await;
                return;
            }
        };
        chunks += 1;

        for fragment in segmenter.push(&chunk) {
            if tx.send(Ok(fragment)).await.is_err() {
                tracing::debug!(chunks = chunks, "Fragment consumer dropped");
                return;
            }
        }
    }

    for fragment in segmenter.finish() {
        if tx.send(Ok(fragment)).await.is_err() {
            return;
        }
    }

    if let Err(e) = segmenter.check_page_count() {
        tracing::warn!(
            expected = e.expected,
            found = e.found,
            "Stream ended with unexpected page count"
        );
        let _ = tx.send(Err(SegmentError::Malformed(e))).await;
        return;
    }

    tracing::debug!(
        chunks = chunks,
        pages = segmenter.page_count(),
        "Token source completed"
    );
}
