//! Delivery sinks
//!
//! A sink is whatever a subscriber hands the broadcaster to receive a job's
//! fragments. Delivery is synchronous and must not block: channel sinks use
//! non-waiting sends, so a reader that stops draining is pruned instead of
//! stalling the producer.

use tokio::sync::mpsc;

use super::error::SinkError;
use super::fragment::Delivery;

/// Receiver side of a subscription
pub trait Sink: Send + 'static {
    /// Accept one delivery
    ///
    /// Returning an error removes the subscriber from its job.
    fn deliver(&mut self, delivery: &Delivery) -> Result<(), SinkError>;
}

impl Sink for mpsc::UnboundedSender<Delivery> {
    fn deliver(&mut self, delivery: &Delivery) -> Result<(), SinkError> {
        self.send(delivery.clone()).map_err(|_| SinkError::Closed)
    }
}

impl Sink for mpsc::Sender<Delivery> {
    fn deliver(&mut self, delivery: &Delivery) -> Result<(), SinkError> {
        self.try_send(delivery.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Sink backed by a closure
pub struct CallbackSink<F>(F);

impl<F> CallbackSink<F>
where
    F: FnMut(&Delivery) -> Result<(), SinkError> + Send + 'static,
{
    /// Wrap a delivery callback
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> Sink for CallbackSink<F>
where
    F: FnMut(&Delivery) -> Result<(), SinkError> + Send + 'static,
{
    fn deliver(&mut self, delivery: &Delivery) -> Result<(), SinkError> {
        (self.0)(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::fragment::Fragment;

    fn delivery() -> Delivery {
        Delivery::Fragment {
            seq: 0,
            fragment: Fragment::text("x"),
        }
    }

    #[test]
    fn test_unbounded_sink_closed() {
        let (mut tx, rx) = mpsc::unbounded_channel::<Delivery>();
        assert!(tx.deliver(&delivery()).is_ok());

        drop(rx);
        assert_eq!(tx.deliver(&delivery()), Err(SinkError::Closed));
    }

    #[test]
    fn test_bounded_sink_full() {
        let (mut tx, _rx) = mpsc::channel(1);
        assert!(tx.deliver(&delivery()).is_ok());
        assert_eq!(tx.deliver(&delivery()), Err(SinkError::Full));
    }

    #[test]
    fn test_callback_sink() {
        let mut calls = 0;
        let mut sink = CallbackSink::new(move |d: &Delivery| {
            calls += 1;
            if calls > 1 {
                return Err(SinkError::Rejected(format!("call {} after {:?}", calls, d)));
            }
            Ok(())
        });

        assert!(sink.deliver(&delivery()).is_ok());
        assert!(matches!(
            sink.deliver(&delivery()),
            Err(SinkError::Rejected(_))
        ));
    }
}
