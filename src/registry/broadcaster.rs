//! Per-job broadcaster and state types
//!
//! A broadcaster owns one job's append-only fragment log and its subscriber
//! set. Every subscriber carries a cursor into the log; a delivery round
//! advances each cursor to the end of the log, so replay for a late joiner
//! and live delivery are the same operation and can neither skip nor repeat
//! a fragment.

use std::time::{Duration, Instant};

use super::fragment::{Delivery, Fragment};
use super::sink::Sink;

/// State of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Producing fragments, open for subscription
    Open,
    /// Finished normally; log is final
    Finished,
    /// Failed; log is not persisted
    Failed,
}

/// Identifier of a subscriber within one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Result of subscribing to a job
#[derive(Debug)]
pub enum Subscription {
    /// Joined the live set after receiving the replay
    Live(SubscriberId),
    /// The job had already finished; here is its complete log
    Finished(Vec<Fragment>),
    /// The sink failed during replay and was not added
    Pruned {
        /// Fragments it accepted before failing
        delivered: usize,
    },
    /// The job had already failed
    Failed,
}

struct Subscriber {
    id: SubscriberId,
    sink: Box<dyn Sink>,
    /// Number of log entries already delivered
    cursor: usize,
    alive: bool,
}

impl Subscriber {
    /// Deliver everything past the cursor; marks the subscriber dead on failure
    fn catch_up(&mut self, log: &[Fragment]) {
        while self.alive && self.cursor < log.len() {
            let delivery = Delivery::Fragment {
                seq: self.cursor,
                fragment: log[self.cursor].clone(),
            };
            match self.sink.deliver(&delivery) {
                Ok(()) => self.cursor += 1,
                Err(e) => {
                    tracing::debug!(
                        subscriber = %self.id,
                        seq = self.cursor,
                        error = %e,
                        "Delivery failed, pruning subscriber"
                    );
                    self.alive = false;
                }
            }
        }
    }
}

/// Fan-out state for a single generation job
pub struct Broadcaster {
    log: Vec<Fragment>,
    subscribers: Vec<Subscriber>,
    state: JobState,
    next_subscriber_id: u64,
    pruned: u64,
    created_at: Instant,
}

impl Broadcaster {
    /// Create an empty, open broadcaster
    pub fn new() -> Self {
        Self {
            log: Vec::new(),
            subscribers: Vec::new(),
            state: JobState::Open,
            next_subscriber_id: 1,
            pruned: 0,
            created_at: Instant::now(),
        }
    }

    /// Current job state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Check if the job still accepts fragments and live subscribers
    pub fn is_open(&self) -> bool {
        self.state == JobState::Open
    }

    /// The log so far
    pub fn log(&self) -> &[Fragment] {
        &self.log
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Append a fragment and deliver it to every live subscriber
    ///
    /// Returns false (and drops the fragment) if the job is no longer open.
    pub fn append(&mut self, fragment: Fragment) -> bool {
        if !self.is_open() {
            return false;
        }

        self.log.push(fragment);
        self.deliver_round();
        true
    }

    /// Add a subscriber
    ///
    /// An open job replays the whole log into `sink` and then keeps it in
    /// the live set, unless the sink fails on the way. A finished job hands
    /// back its complete log instead.
    pub fn subscribe(&mut self, sink: Box<dyn Sink>) -> Subscription {
        match self.state {
            JobState::Finished => return Subscription::Finished(self.log.clone()),
            JobState::Failed => return Subscription::Failed,
            JobState::Open => {}
        }

        let id = SubscriberId(self.next_subscriber_id);
        self.next_subscriber_id += 1;

        let mut subscriber = Subscriber {
            id,
            sink,
            cursor: 0,
            alive: true,
        };
        subscriber.catch_up(&self.log);

        if !subscriber.alive {
            self.pruned += 1;
            return Subscription::Pruned {
                delivered: subscriber.cursor,
            };
        }

        tracing::debug!(
            subscriber = %id,
            replayed = subscriber.cursor,
            subscribers = self.subscribers.len() + 1,
            "Subscriber added"
        );
        self.subscribers.push(subscriber);
        Subscription::Live(id)
    }

    /// Remove a subscriber explicitly
    ///
    /// Returns false if it was not (or no longer) subscribed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        before != self.subscribers.len()
    }

    /// Finish the job
    ///
    /// Flushes any undelivered fragments, signals completion and clears the
    /// subscriber set. Returns the final log.
    pub fn finish(&mut self) -> &[Fragment] {
        if self.is_open() {
            self.deliver_round();
            self.close(Delivery::Completed);
            self.state = JobState::Finished;
        }
        &self.log
    }

    /// Fail the job, notifying every live subscriber
    pub fn fail(&mut self, reason: &str) {
        if self.is_open() {
            self.deliver_round();
            self.close(Delivery::Failed {
                reason: reason.into(),
            });
            self.state = JobState::Failed;
        }
    }

    /// Get a statistics snapshot
    pub fn stats(&self) -> JobStats {
        JobStats {
            fragment_count: self.log.len(),
            separator_count: self.log.iter().filter(|f| f.is_separator()).count(),
            subscriber_count: self.subscribers.len(),
            pruned_subscribers: self.pruned,
            state: self.state,
            age: self.created_at.elapsed(),
        }
    }

    fn deliver_round(&mut self) {
        for subscriber in &mut self.subscribers {
            subscriber.catch_up(&self.log);
        }
        self.compact();
    }

    fn compact(&mut self) {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.alive);
        self.pruned += (before - self.subscribers.len()) as u64;
    }

    fn close(&mut self, signal: Delivery) {
        for mut subscriber in self.subscribers.drain(..) {
            // Failure here only means the reader is already gone
            let _ = subscriber.sink.deliver(&signal);
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for a job
#[derive(Debug, Clone)]
pub struct JobStats {
    /// Number of fragments in the log
    pub fragment_count: usize,
    /// Number of page separators in the log
    pub separator_count: usize,
    /// Number of live subscribers
    pub subscriber_count: usize,
    /// Subscribers removed after a failed delivery
    pub pruned_subscribers: u64,
    /// Current job state
    pub state: JobState,
    /// Time since the job was created
    pub age: Duration,
}
