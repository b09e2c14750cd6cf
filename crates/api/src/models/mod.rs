pub mod artifact;
pub mod record;

pub use artifact::*;
pub use record::*;
