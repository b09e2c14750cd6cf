//! Discovery engine: enumerates a scope, scans artifact headers in
//! parallel into a per-query cache, and answers subtype and capability
//! queries over the result.

pub mod cache;
pub mod config;
pub mod facade;
pub mod logging;
pub mod memory;
pub mod query;
pub mod scan;

pub use config::ScanConfig;
pub use facade::Discovery;
pub use memory::MemoryScope;
pub use query::{MatchMode, MatchStyle, ResourceFinder, TypeFinder};
pub use typescout_api::{DiscoveryError, Result};
