//! Query filter validation and canonical request parameters.
//!
//! Filters arrive as loose strings (from the CLI or a library caller) and are
//! checked against the same grammar as filenames before any request is built.
//! The resulting [`QueryParams`] always lists keys in one fixed order, so the
//! same filters produce the same request URL.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::naming::error::ErrorSink;
use crate::naming::grammar::check_extension;
use crate::naming::tokens::{format_date, parse_loose_date};
use crate::naming::{
    DataLevel, Descriptor, Extension, Field, Instrument, Repointing, ScienceFilePath,
    ValidationErrors, Version, Violation,
};

/// Version filter value selecting the newest version of each product.
pub const LATEST: &str = "latest";

/// Path of the query endpoint, relative to the service URL.
pub const QUERY_ENDPOINT: &str = "query";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Table,
    /// JSON array of records
    Json,
}

/// User supplied search filters. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    pub instrument: Option<String>,
    pub data_level: Option<String>,
    pub descriptor: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub repointing: Option<String>,
    pub version: Option<String>,
    pub extension: Option<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl QueryFilters {
    /// Filters matching the product and version named by a science filename.
    pub fn from_filename(filename: &str) -> Result<Self, QueryError> {
        let record = ScienceFilePath::parse(filename)?;
        Ok(Self {
            instrument: Some(record.instrument().to_string()),
            data_level: Some(record.data_level().to_string()),
            descriptor: record.descriptor().map(|d| d.to_string()),
            start_date: Some(format_date(record.start_date())),
            end_date: None,
            repointing: record.repointing().map(|r| r.token()),
            version: Some(record.version().to_string()),
            extension: Some(record.extension().to_string()),
            output_format: OutputFormat::default(),
        })
    }

    fn is_empty(&self) -> bool {
        self.supplied().next().is_none()
    }

    fn supplied(&self) -> impl Iterator<Item = Field> + '_ {
        [
            (Field::Instrument, &self.instrument),
            (Field::DataLevel, &self.data_level),
            (Field::Descriptor, &self.descriptor),
            (Field::StartDate, &self.start_date),
            (Field::EndDate, &self.end_date),
            (Field::Repointing, &self.repointing),
            (Field::Version, &self.version),
            (Field::Extension, &self.extension),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_some())
        .map(|(field, _)| field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionFilter {
    Exact(Version),
    Latest,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("at least one query filter must be provided (see 'query --help')")]
    NoFilters,

    #[error("version 'latest' must be combined with at least one other filter")]
    LatestAlone,

    #[error("'--filename' must be used by itself, without other filters")]
    FilenameWithFilters,

    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}

/// Validated, ordered request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
    version: Option<VersionFilter>,
    output_format: OutputFormat,
}

impl QueryParams {
    /// Validate filters and put them in canonical order.
    ///
    /// Every invalid filter is reported at once. Nothing here touches the network.
    pub fn normalize(filters: &QueryFilters) -> Result<Self, QueryError> {
        if filters.is_empty() {
            return Err(QueryError::NoFilters);
        }
        let latest = filters.version.as_deref() == Some(LATEST);
        if latest && filters.supplied().count() == 1 {
            return Err(QueryError::LatestAlone);
        }

        let mut sink = ErrorSink::default();
        let instrument = constraint(&mut sink, Field::Instrument, &filters.instrument)
            .and_then(|v| sink.check(Instrument::parse(v)));
        let data_level = constraint(&mut sink, Field::DataLevel, &filters.data_level)
            .and_then(|v| sink.check(DataLevel::parse(v)));
        let descriptor = constraint(&mut sink, Field::Descriptor, &filters.descriptor)
            .and_then(|v| sink.check(Descriptor::parse(v)));
        let start = constraint(&mut sink, Field::StartDate, &filters.start_date)
            .and_then(|v| sink.check(parse_loose_date(Field::StartDate, v)));
        let end = constraint(&mut sink, Field::EndDate, &filters.end_date)
            .and_then(|v| sink.check(parse_loose_date(Field::EndDate, v)));
        let repointing = constraint(&mut sink, Field::Repointing, &filters.repointing)
            .and_then(|v| sink.check(Repointing::parse(v)));
        let version = constraint(&mut sink, Field::Version, &filters.version).and_then(|v| {
            if v == LATEST {
                Some(VersionFilter::Latest)
            } else {
                sink.check(Version::parse(v)).map(VersionFilter::Exact)
            }
        });
        let extension = constraint(&mut sink, Field::Extension, &filters.extension)
            .and_then(|v| sink.check(Extension::parse(v)));

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                sink.push(
                    Field::EndDate,
                    Violation::StartAfterEnd {
                        start: format_date(start),
                        end: format_date(end),
                    },
                );
            }
        }
        if let (Some(ext), Some(level)) = (extension, data_level) {
            sink.check(check_extension(ext, level));
        }

        if !sink.is_empty() {
            let input = serde_json::to_string(filters).unwrap_or_else(|_| format!("{filters:?}"));
            return Err(QueryError::Invalid(sink.finish(input)));
        }

        let mut pairs = Vec::new();
        if let Some(v) = instrument {
            pairs.push(("instrument", v.to_string()));
        }
        if let Some(v) = data_level {
            pairs.push(("data_level", v.to_string()));
        }
        if let Some(v) = descriptor {
            pairs.push(("descriptor", v.to_string()));
        }
        if let Some(v) = start {
            pairs.push(("start_date", format_date(v)));
        }
        if let Some(v) = end {
            pairs.push(("end_date", format_date(v)));
        }
        if let Some(v) = repointing {
            pairs.push(("repointing", v.token()));
        }
        if let Some(VersionFilter::Exact(v)) = &version {
            pairs.push(("version", v.to_string()));
        }
        if let Some(v) = extension {
            pairs.push(("extension", v.to_string()));
        }

        Ok(Self {
            pairs,
            version,
            output_format: filters.output_format,
        })
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn version(&self) -> Option<&VersionFilter> {
        self.version.as_ref()
    }

    /// Whether results should be reduced to the newest version of each product.
    pub fn wants_latest(&self) -> bool {
        matches!(self.version, Some(VersionFilter::Latest))
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// URL-encoded query string, e.g. `instrument=swe&data_level=l0`.
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }

    /// Full request URL against a service base URL.
    pub fn to_url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = endpoint_url(base, QUERY_ENDPOINT)?;
        url.set_query(Some(&self.query_string()));
        Ok(url)
    }
}

/// Join an endpoint path onto a base URL, keeping any path prefix of the base.
pub fn endpoint_url(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
}

fn constraint<'a>(sink: &mut ErrorSink, field: Field, value: &'a Option<String>) -> Option<&'a str> {
    match value.as_deref() {
        Some("") => {
            sink.push(field, Violation::Empty);
            None
        }
        other => other,
    }
}
