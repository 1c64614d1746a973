//! Bounded concurrent job dispatch
//!
//! Side jobs such as illustrations run through a [`JobDispatcher`], which
//! keeps at most `max_concurrency` executors busy and starts the rest in the
//! order they were submitted.
//!
//! ```text
//!  submit(input) ──► queue (FIFO) ──admit──► [slot] executor ──► JobTicket
//!                        ▲                      │
//!                        └──── slot released ◄──┘
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;

pub use config::DispatcherConfig;
pub use dispatcher::{DispatcherStats, JobDispatcher, JobTicket};
pub use error::JobError;
pub use executor::{FnExecutor, JobExecutor, StubPainter};
