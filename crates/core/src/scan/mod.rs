//! Candidate enumeration and the parallel header scan.

pub mod enumerator;
pub mod scanner;

pub use enumerator::{Candidate, Enumerator};
pub use scanner::{ScanReport, Scanner};
