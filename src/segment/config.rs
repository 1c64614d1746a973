//! Segmenter configuration

/// Page segmentation options
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Trailing text of the repeated header to suppress (None = no header)
    pub header_anchor: Option<String>,

    /// Page marker that must open a line, followed only by whitespace
    pub marker: String,

    /// Number of pages the stream should contain
    ///
    /// At most `expected_pages - 1` markers become page separators; later
    /// markers are kept as text.
    pub expected_pages: usize,

    /// Fail the stream when it ends with fewer than `expected_pages` pages
    pub require_page_count: bool,

    /// Give up header suppression once this many bytes are buffered
    pub max_header_len: usize,

    /// Capacity of the fragment channel between segmenter and consumer
    pub channel_capacity: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            header_anchor: None,
            marker: "---".to_string(),
            expected_pages: 3,
            require_page_count: true,
            max_header_len: 64 * 1024, // 64KB
            channel_capacity: 64,
        }
    }
}

impl SegmenterConfig {
    /// Create a config that suppresses a header ending in `anchor`
    pub fn with_header_anchor(anchor: impl Into<String>) -> Self {
        Self::default().header_anchor(anchor)
    }

    /// Set the header anchor
    pub fn header_anchor(mut self, anchor: impl Into<String>) -> Self {
        let anchor = anchor.into();
        self.header_anchor = if anchor.is_empty() { None } else { Some(anchor) };
        self
    }

    /// Disable header suppression
    pub fn no_header(mut self) -> Self {
        self.header_anchor = None;
        self
    }

    /// Set the page marker (ignored if empty)
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !marker.is_empty() {
            self.marker = marker;
        }
        self
    }

    /// Set the expected page count (at least 1)
    pub fn expected_pages(mut self, pages: usize) -> Self {
        self.expected_pages = pages.max(1);
        self
    }

    /// Enable or disable the end-of-stream page count check
    pub fn require_page_count(mut self, required: bool) -> Self {
        self.require_page_count = required;
        self
    }

    /// Set the header buffering limit
    pub fn max_header_len(mut self, len: usize) -> Self {
        self.max_header_len = len;
        self
    }

    /// Set the fragment channel capacity (at least 1)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Number of markers that may become page separators
    pub fn separator_budget(&self) -> usize {
        self.expected_pages.saturating_sub(1)
    }
}
