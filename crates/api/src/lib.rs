//! Shared vocabulary for type discovery: the data model, the
//! `ArtifactScope` / `MetadataReader` seams, and the error taxonomy.

pub mod error;
pub mod models;
pub mod scope;

// Re-export commonly used types
pub use error::{DiscoveryError, Result};
pub use models::*;
pub use scope::{ArtifactScope, BoxError, MetadataReader};
