//! Segmentation error types

use crate::pages::ShapeError;

/// The token source failed or produced unusable data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token source failed: {}", self.0)
    }
}

impl std::error::Error for SourceError {}

/// Terminal failure of a fragment stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// The upstream source failed mid-stream
    Source(SourceError),
    /// The stream ended without the expected page structure
    Malformed(ShapeError),
}

impl std::fmt::Display for SegmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentError::Source(e) => write!(f, "{}", e),
            SegmentError::Malformed(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Source(e) => Some(e),
            SegmentError::Malformed(e) => Some(e),
        }
    }
}

impl From<SourceError> for SegmentError {
    fn from(e: SourceError) -> Self {
        SegmentError::Source(e)
    }
}

impl From<ShapeError> for SegmentError {
    fn from(e: ShapeError) -> Self {
        SegmentError::Malformed(e)
    }
}
