//! Page segmentation of streamed text
//!
//! Turns the raw, arbitrarily chunked output of a generation call into
//! normalized fragments with single page separators.
//!
//! ```text
//!  TokenSource ──chunks──► Segmenter (task) ──mpsc──► FragmentStream
//!                           │ header suppression
//!                           │ marker normalization
//! ```

pub mod config;
pub mod error;
pub mod segmenter;
pub mod source;
pub mod stream;

pub use config::SegmenterConfig;
pub use error::{SegmentError, SourceError};
pub use segmenter::Segmenter;
pub use source::{ScriptedSource, TokenSource};
pub use stream::{open, FragmentStream};
