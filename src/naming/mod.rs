//! The IMAP archive file naming convention.
//!
//! [`grammar`] defines the vocabularies and field layout, [`tokens`] the typed
//! field values, and the remaining modules parse and build filenames and
//! archive paths for each kind of file the archive holds.

pub mod ancillary;
pub mod archive;
pub mod error;
pub mod grammar;
pub mod science;
pub mod spice;
pub mod tokens;

pub use ancillary::{AncillaryFilePath, AncillaryFileRecord};
pub use archive::ArchiveFile;
pub use error::{Field, FieldError, ValidationErrors, Violation};
pub use grammar::{
    compare_data_levels, compare_versions, is_valid_data_level, is_valid_extension,
    is_valid_instrument, DataLevel, Extension, Instrument, MISSION,
};
pub use science::{FileFields, ProductKey, ScienceFilePath, ScienceFileRecord};
pub use spice::{KernelType, SpiceFile, SpiceFilePath};
pub use tokens::{Descriptor, Repointing, SequentialScheme, TimeSpan, Version, VersionScheme};
