//! Per-session memo of parsed artifact headers.

mod scan_cache;

pub use scan_cache::{Lookup, ScanCache};
