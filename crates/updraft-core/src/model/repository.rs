use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entry::{ChangesetEntry, OpKind};
use crate::version::Version;

/// How staged payloads are laid out under a version's staging directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingLayout {
    /// One flat directory per version; payloads are named by the basename of the remote field.
    #[default]
    Flat,
    /// The relative remote path is preserved below the version directory.
    Mirrored,
}

impl StagingLayout {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Mirrored => "mirrored",
        }
    }
}

impl Display for StagingLayout {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for StagingLayout {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "mirrored" => Ok(Self::Mirrored),
            other => Err(format!("unknown staging layout '{other}'")),
        }
    }
}

/// Outcome of registering an entry on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The entry was appended.
    Registered,
    /// An entry with the same kind and local path already exists; nothing changed.
    AlreadyRegistered,
}

/// The set of changes that moves the installation to one version.
#[derive(Debug, Serialize)]
pub struct Repository {
    version: Version,
    entries: Vec<ChangesetEntry>,
    root: PathBuf,
    layout: StagingLayout,
}

impl Repository {
    /// Create an empty repository for `version`.
    #[must_use]
    pub fn new(version: Version, root: impl Into<PathBuf>, layout: StagingLayout) -> Self {
        Self {
            version,
            entries: Vec::new(),
            root: root.into(),
            layout,
        }
    }

    /// Append an entry unless one with the same kind and local path is present.
    #[must_use = "duplicate registrations are reported, not applied"]
    pub fn register(&mut self, entry: ChangesetEntry) -> Registration {
        if self.entries.contains(&entry) {
            return Registration::AlreadyRegistered;
        }
        self.entries.push(entry);
        Registration::Registered
    }

    /// Remove the entry identified by `(kind, local)`.
    pub fn remove_entry(&mut self, kind: OpKind, local: &Path) -> Option<ChangesetEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.kind() == kind && entry.local() == local)?;
        Some(self.entries.remove(index))
    }

    /// Entries in script order.
    #[must_use]
    pub fn entries(&self) -> &[ChangesetEntry] {
        &self.entries
    }

    /// Entries of one operation kind, in script order.
    pub fn entries_of(&self, kind: OpKind) -> impl Iterator<Item = &ChangesetEntry> {
        self.entries.iter().filter(move |entry| entry.kind() == kind)
    }

    /// Target version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Staging directory holding this version's payloads.
    #[must_use]
    pub fn staging_dir(&self, staging_root: &Path) -> PathBuf {
        staging_root.join(self.version.path_safe())
    }
}
