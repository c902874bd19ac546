//! Field-addressable validation errors for archive filenames.
//!
//! Every check against the naming convention produces a [`FieldError`] that
//! names the offending field and the violated rule. Parsing and construction
//! collect all of them into a single [`ValidationErrors`] report.

use std::fmt;

use thiserror::Error;

/// A named field of an archive filename or query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Mission,
    Instrument,
    DataLevel,
    Descriptor,
    StartDate,
    EndDate,
    Repointing,
    Version,
    Extension,
    /// The filename as a whole (wrong number of fields, no extension, ...).
    Filename,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mission => "mission",
            Self::Instrument => "instrument",
            Self::DataLevel => "data_level",
            Self::Descriptor => "descriptor",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::Repointing => "repointing",
            Self::Version => "version",
            Self::Extension => "extension",
            Self::Filename => "filename",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule a field broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("missing value")]
    Missing,

    #[error("empty value is not a valid constraint")]
    Empty,

    #[error("unknown value '{value}', expected one of: {}", .allowed.join(", "))]
    UnknownValue {
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("'{value}' does not match the expected format {expected}")]
    WrongFormat {
        value: String,
        expected: &'static str,
    },

    #[error("'{value}' is not a real calendar date")]
    ImpossibleDate { value: String },

    #[error("'{value}' is out of range ({min}..={max})")]
    OutOfRange { value: String, min: u32, max: u32 },

    #[error("filename does not follow the convention {convention}")]
    Shape { convention: &'static str },

    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: String, end: String },

    #[error("extension '{extension}' is not allowed for data level {data_level} (expected {expected})")]
    ExtensionLevelMismatch {
        extension: String,
        data_level: String,
        expected: &'static str,
    },

    #[error("a descriptor is required for data level {data_level}")]
    DescriptorRequired { data_level: String },

    #[error("an end date and a repointing cannot both be given")]
    EndDateWithRepointing,
}

impl Violation {
    /// Cross-field rule violations, as opposed to syntax or vocabulary errors.
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            Self::StartAfterEnd { .. }
                | Self::ExtensionLevelMismatch { .. }
                | Self::DescriptorRequired { .. }
                | Self::EndDateWithRepointing
        )
    }
}

/// A single violated rule on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {violation}")]
pub struct FieldError {
    pub field: Field,
    pub violation: Violation,
}

impl FieldError {
    pub fn new(field: Field, violation: Violation) -> Self {
        Self { field, violation }
    }

    pub fn is_semantic(&self) -> bool {
        self.violation.is_semantic()
    }
}

/// Every rule an input violated, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    input: String,
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(input: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            input: input.into(),
            errors,
        }
    }

    /// The filename, path or filter set that was rejected.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors reported against `field`.
    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().filter(move |e| e.field == field)
    }

    /// Whether any error was reported against `field`.
    pub fn has(&self, field: Field) -> bool {
        self.for_field(field).next().is_some()
    }

    /// True when every error is a cross-field rule and none is a syntax error.
    pub fn is_semantic_only(&self) -> bool {
        !self.errors.is_empty() && self.errors.iter().all(FieldError::is_semantic)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid '{}'", self.input)?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates field errors while validating several fields in one pass.
#[derive(Debug, Default)]
pub(crate) struct ErrorSink {
    errors: Vec<FieldError>,
}

impl ErrorSink {
    /// Record the error of a failed check and return its success value.
    pub(crate) fn check<T>(&mut self, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.errors.push(error);
                None
            }
        }
    }

    pub(crate) fn push(&mut self, field: Field, violation: Violation) {
        self.errors.push(FieldError::new(field, violation));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn finish(mut self, input: impl Into<String>) -> ValidationErrors {
        self.errors.sort_by_key(|e| e.field);
        ValidationErrors::new(input, self.errors)
    }
}
