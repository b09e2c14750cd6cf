//! Query composition: type finders, subtype closure, resource lookups.

pub mod finder;
pub mod pattern;
pub mod resolver;
pub mod resource;

pub use finder::{MatchMode, QuerySpec, TypeFinder};
pub use pattern::{MatchStyle, Pattern};
pub use resolver::SubtypeResolver;
pub use resource::{ResourceFinder, ResourceQuerySpec};
