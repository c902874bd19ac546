//! Typed filename tokens: dates, descriptors, repointings and versions.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{Field, FieldError, Violation};
use super::grammar::TIME_SEPARATOR;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{8}$").unwrap());
static ISO_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").unwrap());
static DESCRIPTOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());
static REPOINT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^repoint([0-9]{5})$").unwrap());
static SEQUENTIAL_VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v([0-9]{3})$").unwrap());

const DATE_FORMAT: &str = "%Y%m%d";

/// Parse an 8-digit `YYYYMMDD` date.
///
/// Distinguishes a token that is not 8 digits (`WrongFormat`) from 8 digits
/// that do not name a real day (`ImpossibleDate`).
pub fn parse_date(field: Field, value: &str) -> Result<NaiveDate, FieldError> {
    if !DATE_PATTERN.is_match(value) {
        return Err(FieldError::new(
            field,
            Violation::WrongFormat {
                value: value.to_string(),
                expected: "YYYYMMDD",
            },
        ));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        FieldError::new(
            field,
            Violation::ImpossibleDate {
                value: value.to_string(),
            },
        )
    })
}

/// Parse a date filter, accepting `YYYYMMDD` or `YYYY-MM-DD`.
pub fn parse_loose_date(field: Field, value: &str) -> Result<NaiveDate, FieldError> {
    match ISO_DATE_PATTERN.captures(value) {
        Some(caps) => parse_date(field, &format!("{}{}{}", &caps[1], &caps[2], &caps[3])).map_err(
            |e| match e.violation {
                Violation::ImpossibleDate { .. } => FieldError::new(
                    field,
                    Violation::ImpossibleDate {
                        value: value.to_string(),
                    },
                ),
                _ => e,
            },
        ),
        None => parse_date(field, value),
    }
}

/// Format a date as the canonical 8-digit token.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Year and zero-padded month directories for a date.
pub fn year_month(date: NaiveDate) -> (String, String) {
    (format!("{:04}", date.year()), format!("{:02}", date.month()))
}

/// Short token naming a data product within an instrument and level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Descriptor(String);

impl Descriptor {
    pub fn parse(value: &str) -> Result<Self, FieldError> {
        if value.is_empty() {
            return Err(FieldError::new(Field::Descriptor, Violation::Empty));
        }
        if !DESCRIPTOR_PATTERN.is_match(value) {
            return Err(FieldError::new(
                Field::Descriptor,
                Violation::WrongFormat {
                    value: value.to_string(),
                    expected: "lowercase alphanumerics, optionally joined by '-'",
                },
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Descriptor {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Descriptor> for String {
    fn from(value: Descriptor) -> Self {
        value.0
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mission pointing epoch, written as `repointNNNNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Repointing(u32);

impl Repointing {
    pub const MAX: u32 = 99_999;

    pub fn new(number: u32) -> Result<Self, FieldError> {
        if number > Self::MAX {
            return Err(FieldError::new(
                Field::Repointing,
                Violation::OutOfRange {
                    value: number.to_string(),
                    min: 0,
                    max: Self::MAX,
                },
            ));
        }
        Ok(Self(number))
    }

    /// Parse the filename token form, `repointNNNNN`.
    pub fn parse_token(token: &str) -> Result<Self, FieldError> {
        let wrong_format = || {
            FieldError::new(
                Field::Repointing,
                Violation::WrongFormat {
                    value: token.to_string(),
                    expected: "repointNNNNN",
                },
            )
        };
        let caps = REPOINT_PATTERN.captures(token).ok_or_else(wrong_format)?;
        let number = caps[1].parse::<u32>().map_err(|_| wrong_format())?;
        Self::new(number)
    }

    /// Parse either the token form or a bare integer.
    pub fn parse(value: &str) -> Result<Self, FieldError> {
        if value.starts_with("repoint") {
            return Self::parse_token(value);
        }
        let wrong_format = || {
            FieldError::new(
                Field::Repointing,
                Violation::WrongFormat {
                    value: value.to_string(),
                    expected: "repointNNNNN or an integer",
                },
            )
        };
        // u32::from_str would also take a leading '+'.
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(wrong_format());
        }
        let number = value.parse::<u32>().map_err(|_| wrong_format())?;
        Self::new(number)
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn token(&self) -> String {
        format!("repoint{:05}", self.0)
    }
}

impl fmt::Display for Repointing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Sortable key extracted from a version token by a [`VersionScheme`].
///
/// Components compare lexicographically, so a sequential scheme yields one
/// component and a major/minor scheme yields two.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionKey(Vec<u32>);

impl VersionKey {
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

/// Rules for the version token of a filename.
pub trait VersionScheme: Send + Sync {
    /// Human readable form of the expected token.
    fn expected(&self) -> &'static str;

    /// Extract an ordering key, or `None` if the token does not follow the scheme.
    fn key(&self, token: &str) -> Option<VersionKey>;
}

/// `v` followed by a three digit, zero-padded sequence number.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialScheme;

impl VersionScheme for SequentialScheme {
    fn expected(&self) -> &'static str {
        "vNNN"
    }

    fn key(&self, token: &str) -> Option<VersionKey> {
        let caps = SEQUENTIAL_VERSION_PATTERN.captures(token)?;
        Some(VersionKey::new(vec![caps[1].parse().ok()?]))
    }
}

/// Data version of a file. Ordered by the key of the scheme that parsed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    token: String,
    key: VersionKey,
}

impl Version {
    /// Parse with the default [`SequentialScheme`].
    pub fn parse(token: &str) -> Result<Self, FieldError> {
        Self::parse_with(token, &SequentialScheme)
    }

    pub fn parse_with(token: &str, scheme: &dyn VersionScheme) -> Result<Self, FieldError> {
        let key = scheme.key(token).ok_or_else(|| {
            FieldError::new(
                Field::Version,
                Violation::WrongFormat {
                    value: token.to_string(),
                    expected: scheme.expected(),
                },
            )
        })?;
        Ok(Self {
            token: token.to_string(),
            key,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn key(&self) -> &VersionKey {
        &self.key
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Version {}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl TryFrom<String> for Version {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.token
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// The highest version in a set, if any.
pub fn latest_version<'a, I>(versions: I) -> Option<&'a Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    versions.into_iter().max()
}

/// Parsed time field: a start date plus an optional end date or repointing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSpan {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub repointing: Option<Repointing>,
}

impl TimeSpan {
    /// The effective end of the span: the end date, or the start when absent.
    pub fn effective_end(&self) -> NaiveDate {
        self.end.unwrap_or(self.start)
    }

    pub fn token(&self) -> String {
        let start = format_date(self.start);
        match (self.end, self.repointing) {
            (Some(end), _) => format!("{start}{TIME_SEPARATOR}{}", format_date(end)),
            (None, Some(repointing)) => format!("{start}{TIME_SEPARATOR}{}", repointing.token()),
            (None, None) => start,
        }
    }
}

/// Split a time token into its start part and optional suffix.
///
/// The suffix is classified later: `repoint...` is a repointing, anything
/// else is treated as an end date.
pub fn split_time_token(token: &str) -> (&str, Option<&str>) {
    match token.split_once(TIME_SEPARATOR) {
        Some((start, rest)) => (start, Some(rest)),
        None => (token, None),
    }
}
