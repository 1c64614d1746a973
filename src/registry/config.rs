//! Registry configuration

use crate::segment::SegmenterConfig;

/// Job registry options
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Segmentation applied to every stream started through the registry
    pub segmenter: SegmenterConfig,
}

impl RegistryConfig {
    /// Set the segmenter configuration
    pub fn segmenter(mut self, config: SegmenterConfig) -> Self {
        self.segmenter = config;
        self
    }

    /// Set the header anchor suppressed at the start of every stream
    pub fn header_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.segmenter = self.segmenter.header_anchor(anchor);
        self
    }

    /// Set the page count every stream must reach
    pub fn expected_pages(mut self, pages: usize) -> Self {
        self.segmenter = self.segmenter.expected_pages(pages);
        self
    }
}
