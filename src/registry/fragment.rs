//! Fragment types for job logs
//!
//! This module defines the key type identifying a generation job and the
//! fragments that make up its log and are delivered to subscribers.

use std::sync::Arc;

use crate::pages::push_escaped;

/// Text a page sentinel is rendered as when a finished log is persisted
pub fn separator_text(marker: &str) -> String {
    format!("\n\n{}\n\n", marker)
}

/// Unique identifier for a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// One unit of normalized output
///
/// Cheap to clone: the text is reference counted, so fan-out to many
/// subscribers shares one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Page content
    Text(Arc<str>),
    /// Page boundary
    Separator,
}

impl Fragment {
    /// Create a text fragment
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Fragment::Text(text.into())
    }

    /// Check if this is a page separator
    pub fn is_separator(&self) -> bool {
        matches!(self, Fragment::Separator)
    }

    /// Get the text content (None for separators)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Fragment::Text(text) => Some(text),
            Fragment::Separator => None,
        }
    }

    /// Render a finished log in its persisted form
    ///
    /// Separators become `marker` on a line of its own. Marker lines inside
    /// the text are backslash-escaped, so
    /// [`split_pages`](crate::pages::split_pages) with the same marker finds
    /// exactly one page boundary per separator.
    pub fn encode_log(log: &[Fragment], marker: &str) -> String {
        let mut out = String::new();
        let mut run = String::new();
        for fragment in log {
            match fragment {
                Fragment::Text(text) => run.push_str(text),
                Fragment::Separator => {
                    push_escaped(&mut out, &run, marker);
                    run.clear();
                    out.push_str(&separator_text(marker));
                }
            }
        }
        push_escaped(&mut out, &run, marker);
        out
    }
}

/// What a sink receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A fragment and its position in the job's log
    Fragment { seq: usize, fragment: Fragment },
    /// The job finished normally; no more deliveries follow
    Completed,
    /// The job failed; no more deliveries follow
    Failed { reason: Arc<str> },
}
