use serde::Deserialize;

/// Tuning knobs for one scan session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Worker pool size. `None` uses the available hardware parallelism.
    pub worker_threads: Option<usize>,
    /// Enumerate nested artifacts (`Outer$Inner`) as top-level candidates.
    /// Nested artifacts reached as ancestors are scanned either way.
    pub include_nested: bool,
    /// Apply location patterns to ancestors found during recursion too.
    pub filter_ancestors: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            include_nested: false,
            filter_ancestors: true,
        }
    }
}

impl ScanConfig {
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_nested(mut self, include: bool) -> Self {
        self.include_nested = include;
        self
    }

    /// Effective pool size, never zero.
    pub fn workers(&self) -> usize {
        self.worker_threads
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}
