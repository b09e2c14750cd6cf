use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use typescout_api::{BoxError, MetadataReader, MetadataRecord};
use typescout_core::MemoryScope;

pub const ROOT: &str = "lang.Object";

/// Reads a line-oriented stand-in for a binary header:
///
/// ```text
/// artifact <name>
/// extends <ancestor>...
/// marker <name>
/// ```
///
/// Anything not starting with `artifact ` is rejected as unreadable, and
/// `panic` as the first line makes the reader panic.
#[derive(Default)]
pub struct LineReader {
    parses: Mutex<HashMap<String, usize>>,
}

impl LineReader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(dead_code)]
    pub fn parses_of(&self, name: &str) -> usize {
        self.parses.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    #[allow(dead_code)]
    pub fn total_parses(&self) -> usize {
        self.parses.lock().unwrap().values().sum()
    }
}

impl MetadataReader for LineReader {
    fn root_type(&self) -> &str {
        ROOT
    }

    fn read(&self, bytes: &[u8]) -> Result<MetadataRecord, BoxError> {
        let text = std::str::from_utf8(bytes)?;
        let mut lines = text.lines();
        let header = lines.next().ok_or("empty artifact")?;
        if header == "panic" {
            panic!("reader blew up");
        }
        let name = header
            .strip_prefix("artifact ")
            .ok_or_else(|| format!("bad header: {header}"))?;
        *self.parses.lock().unwrap().entry(name.to_string()).or_default() += 1;

        let mut ancestors = Vec::new();
        let mut markers = Vec::new();
        for line in lines {
            if let Some(rest) = line.strip_prefix("extends ") {
                ancestors.extend(rest.split_whitespace().map(str::to_string));
            } else if let Some(rest) = line.strip_prefix("marker ") {
                markers.push(rest.trim().to_string());
            }
        }
        if ancestors.is_empty() && name != ROOT {
            ancestors.push(ROOT.to_string());
        }
        Ok(MetadataRecord::new(ancestors, markers))
    }
}

/// Encode an artifact for [`LineReader`].
pub fn artifact(name: &str, ancestors: &[&str], markers: &[&str]) -> Vec<u8> {
    let mut text = format!("artifact {name}\n");
    if !ancestors.is_empty() {
        text.push_str(&format!("extends {}\n", ancestors.join(" ")));
    }
    for marker in markers {
        text.push_str(&format!("marker {marker}\n"));
    }
    text.into_bytes()
}

pub trait ScopeExt {
    fn with(self, name: &str, ancestors: &[&str], markers: &[&str]) -> Self;
}

impl ScopeExt for MemoryScope {
    fn with(self, name: &str, ancestors: &[&str], markers: &[&str]) -> Self {
        self.with_artifact(name, artifact(name, ancestors, markers))
    }
}
