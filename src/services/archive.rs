// Host archive access
//
// The bootstrap loader owns the archive format. The splash controller only
// needs to find its resource entry and pull requirement files out by name.

use crate::error::SplashError;
use camino::Utf8Path;
use indexmap::IndexMap;
use std::fs;
use std::io;

/// Opaque reference to an archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(pub usize);

/// Kind of an archive table-of-contents entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// The splash resource blob (at most one per archive)
    Splash,
    /// Any other file
    Data,
}

/// Read access to the host archive
pub trait Archive {
    /// Raw bytes of the splash resource entry, if the archive has one
    fn find_splash_resource(&self) -> Option<Vec<u8>>;

    fn find_by_name(&self, name: &str) -> Option<EntryHandle>;

    fn entry_name(&self, entry: EntryHandle) -> Option<&str>;

    /// Names of all regular entries, in table-of-contents order
    fn entry_names(&self) -> Vec<String>;

    fn extract_to_buffer(&self, entry: EntryHandle) -> io::Result<Vec<u8>>;

    /// Write the entry below `dir`, creating intermediate directories
    fn extract_to_directory(&self, entry: EntryHandle, dir: &Utf8Path) -> io::Result<()>;
}

/// Receives one notification per extracted entry
pub trait ProgressSink {
    fn on_progress(&self, entry_name: &str);
}

impl ProgressSink for () {
    fn on_progress(&self, _entry_name: &str) {}
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    kind: EntryKind,
    data: Vec<u8>,
}

/// In-memory archive keyed by entry name, preserving insertion order
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: IndexMap<String, MemoryEntry>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a regular file entry
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.entries.insert(
            name.into(),
            MemoryEntry {
                kind: EntryKind::Data,
                data: data.into(),
            },
        );
        self
    }

    /// Add the splash resource entry
    pub fn insert_splash(&mut self, name: impl Into<String>, blob: Vec<u8>) -> &mut Self {
        self.entries.insert(
            name.into(),
            MemoryEntry {
                kind: EntryKind::Splash,
                data: blob,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, entry: EntryHandle) -> io::Result<(&String, &MemoryEntry)> {
        self.entries.get_index(entry.0).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no archive entry #{}", entry.0))
        })
    }
}

impl Archive for MemoryArchive {
    fn find_splash_resource(&self) -> Option<Vec<u8>> {
        self.entries
            .values()
            .find(|e| e.kind == EntryKind::Splash)
            .map(|e| e.data.clone())
    }

    fn find_by_name(&self, name: &str) -> Option<EntryHandle> {
        self.entries.get_index_of(name).map(EntryHandle)
    }

    fn entry_name(&self, entry: EntryHandle) -> Option<&str> {
        self.entries.get_index(entry.0).map(|(name, _)| name.as_str())
    }

    fn entry_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.kind == EntryKind::Data)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn extract_to_buffer(&self, entry: EntryHandle) -> io::Result<Vec<u8>> {
        self.entry(entry).map(|(_, e)| e.data.clone())
    }

    fn extract_to_directory(&self, entry: EntryHandle, dir: &Utf8Path) -> io::Result<()> {
        let (name, e) = self.entry(entry)?;
        let target = dir.join(name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &e.data)
    }
}

/// Extract every regular entry of `archive` into `dest`
///
/// This is the host's unpacking loop; `progress` is told about each entry
/// before it is written.
pub fn extract_all(
    archive: &dyn Archive,
    dest: &Utf8Path,
    progress: &dyn ProgressSink,
) -> Result<usize, SplashError> {
    let names = archive.entry_names();

    for name in &names {
        let entry = archive
            .find_by_name(name)
            .ok_or_else(|| SplashError::RequirementNotFound(name.clone()))?;

        progress.on_progress(name);

        archive
            .extract_to_directory(entry, dest)
            .map_err(|source| SplashError::Extraction {
                name: name.clone(),
                source,
            })?;
    }

    tracing::info!("Extracted {} archive entries to {}", names.len(), dest);
    Ok(names.len())
}
