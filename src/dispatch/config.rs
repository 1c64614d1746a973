//! Dispatcher configuration

/// Job dispatcher options
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum number of jobs executing at once (at least 1)
    pub max_concurrency: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { max_concurrency: 2 }
    }
}

impl DispatcherConfig {
    /// Set the concurrency limit; 0 is treated as 1
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }
}
