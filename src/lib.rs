//! imap-data-access - query, download and upload IMAP mission data files.
//!
//! The core is the archive naming convention in [`naming`]: filenames are
//! parsed into typed records and records are serialized back to canonical
//! filenames and storage paths. [`query`] validates search filters against the
//! same grammar, [`results`] maps service listings onto the same records, and
//! [`client`] talks to the Science Data Center.

pub mod cli;
pub mod client;
pub mod config;
pub mod naming;
pub mod query;
pub mod results;

pub use client::{AccessError, ArchiveClient, DownloadOutcome};
pub use config::{ConfigOverrides, Settings};
pub use naming::{ArchiveFile, FileFields, ScienceFilePath, ScienceFileRecord, ValidationErrors};
pub use query::{OutputFormat, QueryError, QueryFilters, QueryParams};
pub use results::{MappedListing, MappingError, QueryRecord};
