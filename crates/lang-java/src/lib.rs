//! JVM support: a header-only class-file reader and a classpath scope over
//! directories and jar archives.

pub mod classfile;
pub mod classpath;

pub use classfile::{ClassFileReader, ClassHeader, ClassParseError};
pub use classpath::ClassPath;

use std::sync::Arc;
use typescout_core::Discovery;

/// Universal root of the JVM type hierarchy.
pub const JAVA_LANG_OBJECT: &str = "java.lang.Object";

/// Discovery over `classpath` using the default class-file reader.
pub fn discovery(classpath: ClassPath) -> Discovery {
    Discovery::new(Arc::new(classpath), Arc::new(ClassFileReader::new()))
}
