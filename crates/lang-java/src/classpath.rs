use dashmap::DashMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::hash_map::Entry;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;
use tracing::{debug, warn};
use typescout_api::{
    ArtifactEntry, ArtifactIdentity, ArtifactLocation, ArtifactScope, BoxError, ResourceEntry,
};
use walkdir::WalkDir;
use zip::ZipArchive;

const MANIFEST: &str = "META-INF/MANIFEST.MF";

/// An ordered list of class directories and jar/zip archives.
///
/// Archives referenced through a manifest `Class-Path` attribute are searched
/// right after the archive naming them. Entries that do not exist are
/// skipped, and so are archives that cannot be opened. Listing fails only
/// when every existing entry is unreadable.
///
/// `locate` answers from the class index taken by the last `artifacts()`
/// call, building one on first use.
pub struct ClassPath {
    name: String,
    entries: Vec<PathBuf>,
    listings: DashMap<PathBuf, Arc<ArchiveListing>>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl ClassPath {
    pub fn new<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            name: "classpath".to_string(),
            entries: entries.into_iter().map(Into::into).collect(),
            listings: DashMap::new(),
            snapshot: RwLock::new(None),
        }
    }

    /// Entries from the `CLASSPATH` variable; the working directory when unset.
    pub fn from_env() -> Self {
        let entries: Vec<PathBuf> = std::env::var_os("CLASSPATH")
            .map(|value| {
                std::env::split_paths(&value)
                    .map(|p| if p.as_os_str().is_empty() { PathBuf::from(".") } else { p })
                    .collect()
            })
            .unwrap_or_default();
        if entries.is_empty() {
            Self::new([PathBuf::from(".")])
        } else {
            Self::new(entries)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Expand the entries into searchable roots, following manifests.
    fn roots(&self) -> Vec<Root> {
        let mut roots = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut stack: Vec<PathBuf> = self.entries.iter().rev().cloned().collect();

        while let Some(path) = stack.pop() {
            // Manifests may refer back through `..`; compare resolved paths.
            let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if !seen.insert(key) {
                continue;
            }
            if path.is_dir() {
                roots.push(Root::Directory(path));
            } else if path.is_file() {
                match self.listing(&path) {
                    Ok(listing) => {
                        stack.extend(listing.class_path.iter().rev().cloned());
                        roots.push(Root::Archive(path, listing));
                    }
                    Err(err) => roots.push(Root::Broken(path, err.to_string())),
                }
            } else {
                debug!("Classpath entry {} does not exist, skipping", path.display());
            }
        }
        roots
    }

    /// Roots with unreadable archives reported. Fails when nothing is left.
    fn listable_roots(&self) -> Result<Vec<Root>, BoxError> {
        let roots = self.roots();
        let mut broken = 0;
        for root in &roots {
            if let Root::Broken(path, reason) = root {
                broken += 1;
                warn!(
                    "Skipping unreadable archive {} on {}: {}",
                    path.display(),
                    self.name,
                    reason
                );
            }
        }
        if broken > 0 && broken == roots.len() {
            return Err(format!("no readable entry on {}", self.name).into());
        }
        Ok(roots)
    }

    /// Cached listing of an archive, re-read when its size or mtime changes.
    fn listing(&self, path: &Path) -> Result<Arc<ArchiveListing>, BoxError> {
        let stamp = ArchiveStamp::of(path)?;
        if let Some(cached) = self.listings.get(path) {
            if cached.stamp == stamp {
                return Ok(Arc::clone(&cached));
            }
        }

        let listing = Arc::new(ArchiveListing::read(path, stamp)?);
        debug!(
            "Listed {} classes and {} resources in {}",
            listing.classes.len(),
            listing.resources.len(),
            path.display()
        );
        self.listings
            .insert(path.to_path_buf(), Arc::clone(&listing));
        Ok(listing)
    }

    /// List every class again and replace the stored index.
    fn refresh(&self) -> Result<Arc<Snapshot>, BoxError> {
        let mut artifacts = Vec::new();
        let mut index = HashMap::new();
        let mut record = |identity: ArtifactIdentity, location: ArtifactLocation| {
            if let Entry::Vacant(slot) = index.entry(identity) {
                artifacts.push(ArtifactEntry::new(slot.key().clone(), location.clone()));
                slot.insert(location);
            }
        };

        for root in self.listable_roots()? {
            match root {
                Root::Directory(dir) => {
                    for (relative, path) in walk_files(&dir) {
                        if let Some(identity) = class_identity(&relative) {
                            record(identity, ArtifactLocation::File(path));
                        }
                    }
                }
                Root::Archive(archive, listing) => {
                    for (identity, entry) in &listing.classes {
                        record(
                            identity.clone(),
                            ArtifactLocation::Archive {
                                archive: archive.clone(),
                                entry: entry.clone(),
                            },
                        );
                    }
                }
                Root::Broken(..) => {}
            }
        }

        let snapshot = Arc::new(Snapshot { artifacts, index });
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn current(&self) -> Result<Arc<Snapshot>, BoxError> {
        let stored = self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match stored {
            Some(snapshot) => Ok(snapshot),
            None => self.refresh(),
        }
    }
}

impl ArtifactScope for ClassPath {
    fn name(&self) -> &str {
        &self.name
    }

    fn artifacts(&self) -> Result<Vec<ArtifactEntry>, BoxError> {
        Ok(self.refresh()?.artifacts.clone())
    }

    fn locate(&self, identity: &ArtifactIdentity) -> Option<ArtifactLocation> {
        match self.current() {
            Ok(snapshot) => snapshot.index.get(identity).cloned(),
            Err(err) => {
                debug!("Cannot locate {} on {}: {}", identity, self.name, err);
                None
            }
        }
    }

    fn open(&self, location: &ArtifactLocation) -> Result<Vec<u8>, BoxError> {
        match location {
            ArtifactLocation::File(path) => Ok(fs::read(path)?),
            ArtifactLocation::Archive { archive, entry } => {
                let listing = self.listing(archive)?;
                // Clones share the parsed directory; each reader owns its cursor.
                let mut zip = listing.archive.clone();
                let mut file = zip.by_name(entry)?;
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
            ArtifactLocation::Memory(_) => {
                Err(format!("{location} does not belong to {}", self.name).into())
            }
        }
    }

    fn resources(&self) -> Result<Vec<ResourceEntry>, BoxError> {
        let mut found = Vec::new();
        for root in self.listable_roots()? {
            match root {
                Root::Directory(dir) => {
                    for (relative, path) in walk_files(&dir) {
                        if !relative.ends_with(".class") {
                            found.push(ResourceEntry::new(relative, ArtifactLocation::File(path)));
                        }
                    }
                }
                Root::Archive(archive, listing) => {
                    for name in &listing.resources {
                        found.push(ResourceEntry::new(
                            name.clone(),
                            ArtifactLocation::Archive {
                                archive: archive.clone(),
                                entry: name.clone(),
                            },
                        ));
                    }
                }
                Root::Broken(..) => {}
            }
        }
        Ok(found)
    }
}

impl fmt::Debug for ClassPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassPath")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .field("cached_archives", &self.listings.len())
            .finish()
    }
}

/// Classes in search order, first occurrence of each identity only.
struct Snapshot {
    artifacts: Vec<ArtifactEntry>,
    index: HashMap<ArtifactIdentity, ArtifactLocation>,
}

enum Root {
    Directory(PathBuf),
    Archive(PathBuf, Arc<ArchiveListing>),
    Broken(PathBuf, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArchiveStamp {
    size: u64,
    modified: SystemTime,
}

impl ArchiveStamp {
    fn of(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            size: metadata.len(),
            modified: metadata.modified()?,
        })
    }
}

struct ArchiveListing {
    stamp: ArchiveStamp,
    /// Top-level and nested classes, in archive order.
    classes: Vec<(ArtifactIdentity, String)>,
    resources: Vec<String>,
    /// Manifest `Class-Path`, resolved against the archive's directory.
    class_path: Vec<PathBuf>,
    archive: ZipArchive<Cursor<Arc<[u8]>>>,
}

impl ArchiveListing {
    fn read(path: &Path, stamp: ArchiveStamp) -> Result<Self, BoxError> {
        let bytes: Arc<[u8]> = fs::read(path)?.into();
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let mut classes = Vec::new();
        let mut resources = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name();
            if name.ends_with(".class") {
                if let Some(identity) = class_identity(name) {
                    classes.push((identity, name.to_string()));
                }
            } else {
                resources.push(name.to_string());
            }
        }

        let manifest = match archive.by_name(MANIFEST) {
            Ok(mut entry) => {
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes)?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
            Err(_) => String::new(),
        };
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let class_path = manifest_class_path(&manifest)
            .into_iter()
            .map(|reference| base.join(reference.replace("%20", " ")))
            .collect();

        Ok(Self {
            stamp,
            classes,
            resources,
            class_path,
            archive,
        })
    }
}

/// Multi-release copies under `META-INF/` shadow nothing.
fn class_identity(relative: &str) -> Option<ArtifactIdentity> {
    if relative.starts_with("META-INF/") {
        return None;
    }
    ArtifactIdentity::from_resource_path(relative)
}

/// Regular files under `dir` with `/`-separated relative paths, sorted.
fn walk_files(dir: &Path) -> Vec<(String, PathBuf)> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable path under {}: {}", dir.display(), err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(dir).ok()?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some((relative, entry.into_path()))
        })
        .collect()
}

/// Space-separated `Class-Path` of the manifest's main section, with
/// continuation lines joined.
fn manifest_class_path(manifest: &str) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for line in manifest.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(continued) = line.strip_prefix(' ') {
            if let Some(last) = headers.last_mut() {
                last.push_str(continued);
            }
            continue;
        }
        headers.push(line.to_string());
    }

    headers
        .iter()
        .find_map(|header| {
            let (key, value) = header.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("Class-Path")
                .then(|| value.split_whitespace().map(str::to_string).collect())
        })
        .unwrap_or_default()
}
