use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

/// Fully-qualified binary name of one compiled unit, e.g. `com.acme.Widget`
/// or `com.acme.Outer$Inner`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ArtifactIdentity(String);

impl ArtifactIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build an identity from an archive-relative path such as `a/b/C.class`.
    /// Returns `None` for non-class paths and for `module-info` / `package-info`.
    pub fn from_resource_path(path: &str) -> Option<Self> {
        let stem = path.strip_suffix(".class")?;
        let simple = stem.rsplit('/').next().unwrap_or(stem);
        if simple.is_empty() || simple == "module-info" || simple == "package-info" {
            return None;
        }
        Some(Self(stem.trim_start_matches('/').replace('/', ".")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Package part of the name; empty for the default namespace.
    pub fn namespace(&self) -> &str {
        self.0.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
    }

    pub fn simple_name(&self) -> &str {
        self.0.rsplit_once('.').map(|(_, n)| n).unwrap_or(&self.0)
    }

    /// Nested units carry a `$` in their simple name.
    pub fn is_nested(&self) -> bool {
        self.simple_name().contains('$')
    }

    /// True when the identity lives in `namespace` or one of its sub-namespaces.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        let namespace = namespace.trim_end_matches('.');
        if namespace.is_empty() {
            return true;
        }
        let own = self.namespace();
        own == namespace
            || own
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Archive-relative path of the compiled unit, e.g. `a/b/C.class`.
    pub fn resource_path(&self) -> String {
        format!("{}.class", self.0.replace('.', "/"))
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArtifactIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where the bytes of an artifact or resource live.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactLocation {
    /// A loose file on disk.
    File(PathBuf),
    /// An entry inside a jar/zip archive.
    Archive { archive: PathBuf, entry: String },
    /// A key into an in-memory scope.
    Memory(String),
}

impl ArtifactLocation {
    /// The string location patterns are tested against.
    pub fn match_target(&self) -> Cow<'_, str> {
        match self {
            ArtifactLocation::File(path) => path.to_string_lossy(),
            ArtifactLocation::Archive { archive, entry } => {
                Cow::Owned(format!("{}!/{}", archive.display(), entry))
            }
            ArtifactLocation::Memory(key) => Cow::Borrowed(key),
        }
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactLocation::File(path) => write!(f, "file:{}", path.display()),
            ArtifactLocation::Archive { archive, entry } => {
                write!(f, "jar:file:{}!/{}", archive.display(), entry)
            }
            ArtifactLocation::Memory(key) => write!(f, "mem:{key}"),
        }
    }
}

/// One enumerated candidate. The location is absent when the scope lists a
/// name it cannot resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub identity: ArtifactIdentity,
    pub location: Option<ArtifactLocation>,
}

impl ArtifactEntry {
    pub fn new(identity: ArtifactIdentity, location: ArtifactLocation) -> Self {
        Self {
            identity,
            location: Some(location),
        }
    }

    pub fn unresolved(identity: ArtifactIdentity) -> Self {
        Self {
            identity,
            location: None,
        }
    }
}

/// A non-type resource visible in a scope, e.g. `META-INF/services/x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub location: ArtifactLocation,
}

impl ResourceEntry {
    pub fn new(name: impl Into<String>, location: ArtifactLocation) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// A discovered type, resolved back to a loadable location.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactHandle {
    pub identity: ArtifactIdentity,
    pub location: ArtifactLocation,
}

impl ArtifactHandle {
    pub fn name(&self) -> &str {
        self.identity.as_str()
    }
}
