//! Any file the archive accepts, resolved to its archive path.

use std::fmt;
use std::path::{Path, PathBuf};

use super::ancillary::{AncillaryFilePath, AncillaryFileRecord};
use super::error::ValidationErrors;
use super::grammar::Extension;
use super::science::{ScienceFilePath, ScienceFileRecord};
use super::spice::{is_spice_filename, SpiceFile, SpiceFilePath};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArchiveFile {
    Science(ScienceFileRecord),
    Ancillary(AncillaryFileRecord),
    Spice(SpiceFile),
}

impl ArchiveFile {
    /// Classify a filename or path by its suffix and parse it with the matching convention.
    pub fn parse(input: &str) -> Result<Self, ValidationErrors> {
        let name = input.rsplit(['/', '\\']).next().unwrap_or(input);
        if is_spice_filename(name) {
            return SpiceFilePath::parse(input).map(Self::Spice);
        }
        let is_ancillary = name
            .rsplit_once('.')
            .and_then(|(_, ext)| Extension::parse(ext).ok())
            .is_some_and(|ext| ext.is_ancillary());
        if is_ancillary {
            AncillaryFilePath::parse(input).map(Self::Ancillary)
        } else {
            ScienceFilePath::parse(input).map(Self::Science)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Science(_) => "science",
            Self::Ancillary(_) => "ancillary",
            Self::Spice(_) => "spice",
        }
    }

    pub fn filename(&self) -> String {
        match self {
            Self::Science(r) => r.filename(),
            Self::Ancillary(r) => r.filename(),
            Self::Spice(f) => f.filename().to_string(),
        }
    }

    /// Path in the archive, starting at the mission directory.
    pub fn archive_path(&self) -> String {
        match self {
            Self::Science(r) => r.archive_path(),
            Self::Ancillary(r) => r.archive_path(),
            Self::Spice(f) => f.archive_path(),
        }
    }

    pub fn local_path(&self, root: &Path) -> PathBuf {
        match self {
            Self::Science(r) => r.local_path(root),
            Self::Ancillary(r) => r.local_path(root),
            Self::Spice(f) => f.local_path(root),
        }
    }
}

impl fmt::Display for ArchiveFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

impl From<ScienceFileRecord> for ArchiveFile {
    fn from(record: ScienceFileRecord) -> Self {
        Self::Science(record)
    }
}
