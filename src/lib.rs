//! Streaming page segmentation, replaying fan-out and bounded job dispatch
//!
//! A generation call streams raw text in arbitrary chunks. This crate turns
//! that text into page fragments, fans every fragment out to any number of
//! readers (late readers get a full replay first) and runs side jobs such as
//! illustrations with bounded concurrency.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gazette_rs::persist::MemoryStore;
//! use gazette_rs::registry::{Attachment, JobRegistry, RegistryConfig};
//! use gazette_rs::segment::ScriptedSource;
//!
//! # async fn example() -> gazette_rs::Result<()> {
//! let config = RegistryConfig::default()
//!     .header_anchor("*Fox Newroll Network*")
//!     .expected_pages(1);
//! let registry = Arc::new(JobRegistry::with_config(MemoryStore::new(), config));
//!
//! let source = ScriptedSource::new(["...*Fox Newroll Network*\n", "---\nPage one"]);
//! let job = registry.start_segmented_stream(source).await;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! if let Attachment::Live(_) = registry.attach(job.id(), tx).await? {
//!     while let Some(delivery) = rx.recv().await {
//!         println!("{:?}", delivery);
//!     }
//! }
//!
//! let content = job.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod pages;
pub mod persist;
pub mod registry;
pub mod segment;

pub use dispatch::{DispatcherConfig, JobDispatcher, JobError, JobExecutor, JobTicket};
pub use error::{Error, Result};
pub use persist::{ContentStore, MemoryStore, StoreError};
pub use registry::{Attachment, Delivery, Fragment, JobHandle, JobId, JobRegistry, RegistryConfig};
pub use segment::{SegmenterConfig, SourceError, TokenSource};
