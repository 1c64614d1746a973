//! Job registry for fragment fan-out
//!
//! The registry owns every open generation job. Each job keeps an
//! append-only log of fragments; readers attach at any time and always see
//! the whole log, first as a replay and then live.
//!
//! # Architecture
//!
//! ```text
//!                           Arc<JobRegistry<S>>
//!                     ┌──────────────────────────┐
//!                     │ jobs: HashMap<JobId,     │
//!                     │   Mutex<Broadcaster {    │
//!                     │     log: Vec<Fragment>,  │
//!                     │     subscribers,         │
//!                     │   }>                     │
//!                     │ >                        │
//!                     └────────────┬─────────────┘
//!                                  │
//!          ┌───────────────────────┼───────────────────────┐
//!          │                       │                       │
//!          ▼                       ▼                       ▼
//!     [pump task]              [Sink]                  [Sink]
//!     FragmentStream        deliver(&Delivery)      deliver(&Delivery)
//!          │
//!          └──► registry.append() ──► every cursor catches up
//!               registry.finish() ──► ContentStore::save
//! ```
//!
//! # Sharing
//!
//! Fragment text is an `Arc<str>`, so every subscriber's delivery shares the
//! log's allocation.

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod fragment;
pub mod handle;
pub mod sink;
pub mod store;

pub use broadcaster::{Broadcaster, JobState, JobStats, SubscriberId, Subscription};
pub use config::RegistryConfig;
pub use error::{RegistryError, SinkError};
pub use fragment::{separator_text, Delivery, Fragment, JobId};
pub use handle::{Attachment, JobHandle};
pub use sink::{CallbackSink, Sink};
pub use store::JobRegistry;
