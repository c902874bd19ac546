//! Science data filenames: parsing, construction and storage paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{ErrorSink, Field, ValidationErrors, Violation};
use super::grammar::{
    assign_slots, check_extension, DataLevel, Extension, Instrument, Slot, FIELD_LAYOUT,
    FIELD_SEPARATOR, FILENAME_CONVENTION, MISSION,
};
use super::tokens::{
    format_date, parse_date, split_time_token, year_month, Descriptor, Repointing,
    SequentialScheme, TimeSpan, Version, VersionScheme,
};

/// Loosely typed field set, as supplied by a caller or read from JSON.
///
/// This is the interchange form of a [`ScienceFileRecord`]; nothing here is
/// validated until it goes through [`ScienceFilePath::construct`]. A missing
/// `extension` is inferred from the data level, so parsing the constructed
/// filename yields these fields with the extension filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFields {
    pub instrument: String,
    pub data_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repointing: Option<u32>,
    pub version: String,
    /// Inferred from the data level when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

/// Fields grouping versions of the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub instrument: Instrument,
    pub data_level: DataLevel,
    pub descriptor: Option<Descriptor>,
    pub span: TimeSpan,
}

/// A validated science file. Immutable; derive a changed copy with the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "FileFields", try_from = "FileFields")]
pub struct ScienceFileRecord {
    instrument: Instrument,
    data_level: DataLevel,
    descriptor: Option<Descriptor>,
    span: TimeSpan,
    version: Version,
    extension: Extension,
}

impl ScienceFileRecord {
    pub fn mission(&self) -> &'static str {
        MISSION
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn data_level(&self) -> DataLevel {
        self.data_level
    }

    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.span.start
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.span.end
    }

    /// End date for path and query purposes: the start date when none was given.
    pub fn effective_end_date(&self) -> NaiveDate {
        self.span.effective_end()
    }

    pub fn repointing(&self) -> Option<Repointing> {
        self.span.repointing
    }

    pub fn span(&self) -> &TimeSpan {
        &self.span
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn extension(&self) -> Extension {
        self.extension
    }

    /// A copy of this record at another version.
    pub fn with_version(&self, version: Version) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }

    pub fn product_key(&self) -> ProductKey {
        ProductKey {
            instrument: self.instrument,
            data_level: self.data_level,
            descriptor: self.descriptor.clone(),
            span: self.span,
        }
    }

    /// Canonical filename, serialized by walking [`FIELD_LAYOUT`].
    pub fn filename(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(FIELD_LAYOUT.len());
        for spec in FIELD_LAYOUT {
            match spec.slot {
                Slot::Mission => parts.push(MISSION.to_string()),
                Slot::Instrument => parts.push(self.instrument.to_string()),
                Slot::DataLevel => parts.push(self.data_level.to_string()),
                Slot::Descriptor => {
                    if let Some(descriptor) = &self.descriptor {
                        parts.push(descriptor.to_string());
                    }
                }
                Slot::Time => parts.push(self.span.token()),
                Slot::Version => parts.push(self.version.to_string()),
            }
        }
        format!(
            "{}.{}",
            parts.join(&FIELD_SEPARATOR.to_string()),
            self.extension
        )
    }

    /// `<instrument>/<data_level>/<YYYY>/<MM>/<filename>`, relative to the mission root.
    pub fn storage_path(&self) -> String {
        let (year, month) = year_month(self.span.start);
        format!(
            "{}/{}/{}/{}/{}",
            self.instrument,
            self.data_level,
            year,
            month,
            self.filename()
        )
    }

    /// Path of the file in the archive, including the mission directory.
    pub fn archive_path(&self) -> String {
        format!("{}/{}", MISSION, self.storage_path())
    }

    /// Where the file lives under a local data directory.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        let (year, month) = year_month(self.span.start);
        root.join(MISSION)
            .join(self.instrument.as_str())
            .join(self.data_level.as_str())
            .join(year)
            .join(month)
            .join(self.filename())
    }

    pub fn to_fields(&self) -> FileFields {
        FileFields {
            instrument: self.instrument.to_string(),
            data_level: self.data_level.to_string(),
            descriptor: self.descriptor.as_ref().map(|d| d.to_string()),
            start_date: format_date(self.span.start),
            end_date: self.span.end.map(format_date),
            repointing: self.span.repointing.map(|r| r.number()),
            version: self.version.to_string(),
            extension: Some(self.extension.to_string()),
        }
    }
}

impl fmt::Display for ScienceFileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

impl FromStr for ScienceFileRecord {
    type Err = ValidationErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScienceFilePath::parse(s)
    }
}

impl From<ScienceFileRecord> for FileFields {
    fn from(record: ScienceFileRecord) -> Self {
        record.to_fields()
    }
}

impl TryFrom<FileFields> for ScienceFileRecord {
    type Error = ValidationErrors;

    fn try_from(fields: FileFields) -> Result<Self, Self::Error> {
        ScienceFilePath::record_from_fields(&fields)
    }
}

/// Unvalidated field tokens gathered from a filename or a [`FileFields`].
#[derive(Debug, Default)]
struct RawFields<'a> {
    mission: Option<&'a str>,
    instrument: Option<&'a str>,
    data_level: Option<&'a str>,
    descriptor: Option<&'a str>,
    start_date: Option<&'a str>,
    end_date: Option<&'a str>,
    repointing: Option<RawRepointing<'a>>,
    version: Option<&'a str>,
    extension: Option<&'a str>,
}

#[derive(Debug)]
enum RawRepointing<'a> {
    Token(&'a str),
    Number(u32),
}

/// Bidirectional mapping between [`ScienceFileRecord`]s and canonical filenames.
pub struct ScienceFilePath;

impl ScienceFilePath {
    /// Parse a filename, or a path whose last component is a filename.
    ///
    /// Every violated rule is reported, not only the first.
    pub fn parse(input: &str) -> Result<ScienceFileRecord, ValidationErrors> {
        Self::parse_with(input, &SequentialScheme)
    }

    pub fn parse_with(
        input: &str,
        scheme: &dyn VersionScheme,
    ) -> Result<ScienceFileRecord, ValidationErrors> {
        let name = basename(input);
        let shape_error = || {
            let mut sink = ErrorSink::default();
            sink.push(
                Field::Filename,
                Violation::Shape {
                    convention: FILENAME_CONVENTION,
                },
            );
            sink.finish(input)
        };

        let (stem, extension) = name.rsplit_once('.').ok_or_else(shape_error)?;
        let tokens: Vec<&str> = stem.split(FIELD_SEPARATOR).collect();
        let slots = assign_slots(FIELD_LAYOUT, &tokens).ok_or_else(shape_error)?;

        let mut raw = RawFields {
            extension: Some(extension),
            ..RawFields::default()
        };
        for (slot, token) in slots {
            match slot {
                Slot::Mission => raw.mission = Some(token),
                Slot::Instrument => raw.instrument = Some(token),
                Slot::DataLevel => raw.data_level = Some(token),
                Slot::Descriptor => raw.descriptor = Some(token),
                Slot::Time => {
                    let (start, suffix) = split_time_token(token);
                    raw.start_date = Some(start);
                    match suffix {
                        Some(s) if s.starts_with("repoint") => {
                            raw.repointing = Some(RawRepointing::Token(s))
                        }
                        Some(s) => raw.end_date = Some(s),
                        None => {}
                    }
                }
                Slot::Version => raw.version = Some(token),
            }
        }

        validate(input, raw, scheme)
    }

    /// Validate a field set exactly as [`parse`](Self::parse) would and
    /// return its canonical filename.
    pub fn construct(fields: &FileFields) -> Result<String, ValidationErrors> {
        Ok(Self::record_from_fields(fields)?.filename())
    }

    pub fn record_from_fields(fields: &FileFields) -> Result<ScienceFileRecord, ValidationErrors> {
        Self::record_from_fields_with(fields, &SequentialScheme)
    }

    pub fn record_from_fields_with(
        fields: &FileFields,
        scheme: &dyn VersionScheme,
    ) -> Result<ScienceFileRecord, ValidationErrors> {
        let raw = RawFields {
            mission: None,
            instrument: Some(fields.instrument.as_str()),
            data_level: Some(fields.data_level.as_str()),
            descriptor: fields.descriptor.as_deref(),
            start_date: Some(fields.start_date.as_str()),
            end_date: fields.end_date.as_deref(),
            repointing: fields.repointing.map(RawRepointing::Number),
            version: Some(fields.version.as_str()),
            extension: fields.extension.as_deref(),
        };
        validate(&describe_fields(fields), raw, scheme)
    }

    /// Storage path of an already validated record.
    pub fn to_storage_path(record: &ScienceFileRecord) -> String {
        record.storage_path()
    }
}

fn basename(input: &str) -> &str {
    input.rsplit(['/', '\\']).next().unwrap_or(input)
}

fn describe_fields(fields: &FileFields) -> String {
    serde_json::to_string(fields).unwrap_or_else(|_| format!("{fields:?}"))
}

fn required<'a>(sink: &mut ErrorSink, field: Field, value: Option<&'a str>) -> Option<&'a str> {
    if value.is_none() {
        sink.push(field, Violation::Missing);
    }
    value
}

fn validate(
    input: &str,
    raw: RawFields<'_>,
    scheme: &dyn VersionScheme,
) -> Result<ScienceFileRecord, ValidationErrors> {
    let mut sink = ErrorSink::default();

    if let Some(mission) = raw.mission {
        if mission != MISSION {
            sink.push(
                Field::Mission,
                Violation::UnknownValue {
                    value: mission.to_string(),
                    allowed: vec![MISSION],
                },
            );
        }
    }

    let instrument = required(&mut sink, Field::Instrument, raw.instrument)
        .and_then(|v| sink.check(Instrument::parse(v)));
    let data_level = required(&mut sink, Field::DataLevel, raw.data_level)
        .and_then(|v| sink.check(DataLevel::parse(v)));
    let descriptor = match raw.descriptor {
        Some(v) => sink.check(Descriptor::parse(v)).map(Some),
        None => Some(None),
    };
    let start = required(&mut sink, Field::StartDate, raw.start_date)
        .and_then(|v| sink.check(parse_date(Field::StartDate, v)));
    let end = match raw.end_date {
        Some(v) => sink.check(parse_date(Field::EndDate, v)).map(Some),
        None => Some(None),
    };
    let repointing = match raw.repointing {
        Some(RawRepointing::Token(t)) => sink.check(Repointing::parse_token(t)).map(Some),
        Some(RawRepointing::Number(n)) => sink.check(Repointing::new(n)).map(Some),
        None => Some(None),
    };
    let version = required(&mut sink, Field::Version, raw.version)
        .and_then(|v| sink.check(Version::parse_with(v, scheme)));
    let extension = match (raw.extension, data_level) {
        (Some(v), _) => sink.check(Extension::parse(v)),
        (None, Some(level)) => Some(level.science_extension()),
        (None, None) => None,
    };

    // Cross-field rules, checked only where the fields involved are valid.
    if let (Some(level), Some(None)) = (data_level, &descriptor) {
        if !level.is_descriptor_optional() {
            sink.push(
                Field::Descriptor,
                Violation::DescriptorRequired {
                    data_level: level.to_string(),
                },
            );
        }
    }
    if let (Some(Some(_)), Some(Some(_))) = (end, repointing) {
        sink.push(Field::EndDate, Violation::EndDateWithRepointing);
    }
    if let (Some(start), Some(Some(end))) = (start, end) {
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

    match (
        instrument, data_level, descriptor, start, end, repointing, version, extension,
    ) {
        (
            Some(instrument),
            Some(data_level),
            Some(descriptor),
            Some(start),
            Some(end),
            Some(repointing),
            Some(version),
            Some(extension),
        ) if sink.is_empty() => Ok(ScienceFileRecord {
            instrument,
            data_level,
            descriptor,
            span: TimeSpan {
                start,
                end,
                repointing,
            },
            version,
            extension,
        }),
        _ => Err(sink.finish(input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swe_fields() -> FileFields {
        FileFields {
            instrument: "swe".into(),
            data_level: "l0".into(),
            descriptor: Some("sci".into()),
            start_date: "20240105".into(),
            version: "v001".into(),
            extension: Some("pkts".into()),
            ..FileFields::default()
        }
    }

    #[test]
    fn test_construct_and_storage_path() {
        let filename = ScienceFilePath::construct(&swe_fields()).unwrap();
        assert_eq!(filename, "imap_swe_l0_sci_20240105_v001.pkts");

        let record = ScienceFilePath::record_from_fields(&swe_fields()).unwrap();
        assert_eq!(
            record.storage_path(),
            "swe/l0/2024/01/imap_swe_l0_sci_20240105_v001.pkts"
        );
        assert_eq!(record.storage_path(), ScienceFilePath::to_storage_path(&record));
        assert_eq!(
            record.archive_path(),
            "imap/swe/l0/2024/01/imap_swe_l0_sci_20240105_v001.pkts"
        );
    }

    #[test]
    fn test_parse_recovers_constructed_fields() {
        let record = ScienceFilePath::parse("imap_swe_l0_sci_20240105_v001.pkts").unwrap();
        assert_eq!(record.to_fields(), swe_fields());
        assert_eq!(record.mission(), "imap");
        assert_eq!(record.effective_end_date(), record.start_date());
    }

    #[test]
    fn test_round_trip_shapes() {
        let shapes = [
            FileFields {
                instrument: "mag".into(),
                data_level: "l1a".into(),
                descriptor: Some("burst-1min".into()),
                start_date: "20240105".into(),
                end_date: Some("20240107".into()),
                version: "v010".into(),
                extension: Some("cdf".into()),
                ..FileFields::default()
            },
            FileFields {
                instrument: "hi".into(),
                data_level: "l2".into(),
                descriptor: Some("sensor45".into()),
                start_date: "20250101".into(),
                repointing: Some(12),
                version: "v002".into(),
                extension: Some("cdf".into()),
                ..FileFields::default()
            },
            FileFields {
                instrument: "idex".into(),
                data_level: "l0".into(),
                start_date: "20231231".into(),
                version: "v001".into(),
                extension: Some("pkts".into()),
                ..FileFields::default()
            },
        ];
        for fields in shapes {
            let filename = ScienceFilePath::construct(&fields).unwrap();
            let parsed = ScienceFilePath::parse(&filename).unwrap();
            assert_eq!(parsed.to_fields(), fields, "round trip of {filename}");
        }

        // An omitted extension comes back filled in from the level.
        let mut fields = swe_fields();
        fields.extension = None;
        let parsed = ScienceFilePath::parse(&ScienceFilePath::construct(&fields).unwrap()).unwrap();
        assert_eq!(parsed, ScienceFilePath::record_from_fields(&fields).unwrap());
        assert_eq!(parsed.to_fields(), swe_fields());
    }

    #[test]
    fn test_non_ascii_digits_rejected_as_format() {
        let err = ScienceFilePath::parse("imap_swe_l0_sci_٢٠٢٤٠١٠٥_v001.pkts").unwrap_err();
        assert!(matches!(
            err.for_field(Field::StartDate).next().unwrap().violation,
            Violation::WrongFormat { .. }
        ));

        let err =
            ScienceFilePath::parse("imap_swe_l0_sci_20240105-repoint٠٠٠١٢_v001.pkts").unwrap_err();
        assert!(err.has(Field::Repointing));
        assert!(!err.to_string().contains("4294967295"));
    }

    #[test]
    fn test_repointing_filename() {
        let record =
            ScienceFilePath::parse("imap_hi_l2_sensor45_20250101-repoint00012_v002.cdf").unwrap();
        assert_eq!(record.repointing().map(|r| r.number()), Some(12));
        assert_eq!(record.end_date(), None);
    }

    #[test]
    fn test_extension_inferred_from_level() {
        let mut fields = swe_fields();
        fields.extension = None;
        assert_eq!(
            ScienceFilePath::construct(&fields).unwrap(),
            "imap_swe_l0_sci_20240105_v001.pkts"
        );
        fields.data_level = "l1b".into();
        assert!(ScienceFilePath::construct(&fields).unwrap().ends_with(".cdf"));
    }

    #[test]
    fn test_descriptor_optional_only_for_l0() {
        let record = ScienceFilePath::parse("imap_swe_l0_20240105_v001.pkts").unwrap();
        assert!(record.descriptor().is_none());
        assert_eq!(
            record.storage_path(),
            "swe/l0/2024/01/imap_swe_l0_20240105_v001.pkts"
        );

        let err = ScienceFilePath::parse("imap_swe_l1a_20240105_v001.cdf").unwrap_err();
        assert!(err.has(Field::Descriptor));
        assert!(err.is_semantic_only());
    }

    #[test]
    fn test_rejection_is_complete() {
        let err = ScienceFilePath::parse("imap_xyz_l0_raw_20241301_v001.pkts").unwrap_err();
        assert!(err.has(Field::Instrument));
        assert!(err.has(Field::StartDate));
        assert_eq!(err.len(), 2);
        assert!(matches!(
            err.for_field(Field::StartDate).next().unwrap().violation,
            Violation::ImpossibleDate { .. }
        ));
    }

    #[test]
    fn test_semantic_rejections() {
        let err = ScienceFilePath::parse("imap_swe_l1a_sci_20240107-20240105_v001.cdf").unwrap_err();
        assert!(err.is_semantic_only());
        assert!(err.has(Field::EndDate));

        let err = ScienceFilePath::parse("imap_swe_l1a_sci_20240105_v001.pkts").unwrap_err();
        assert!(err.is_semantic_only());
        assert!(err.has(Field::Extension));

        let mut fields = swe_fields();
        fields.end_date = Some("20240106".into());
        fields.repointing = Some(3);
        let err = ScienceFilePath::construct(&fields).unwrap_err();
        assert!(matches!(
            err.errors()[0].violation,
            Violation::EndDateWithRepointing
        ));
    }

    #[test]
    fn test_syntax_rejections() {
        let cases = [
            ("imap_swe_l0_sci_20240105_v1.pkts", Field::Version),
            ("imap_swe_l0_sci_2024-01-05_v001.pkts", Field::StartDate),
            ("imap_swe_l0_Sci_20240105_v001.pkts", Field::Descriptor),
            ("imap_swe_l0_sci_20240105_v001.fits", Field::Extension),
            ("imap_swe_l9_sci_20240105_v001.cdf", Field::DataLevel),
            ("sdc_swe_l0_sci_20240105_v001.pkts", Field::Mission),
            ("imap_swe_l0_sci_20240105-repoint1_v001.pkts", Field::Repointing),
            ("imap_swe_l0_sci_20240105_v001", Field::Filename),
            ("imap_swe_sci_v001.pkts", Field::Filename),
        ];
        for (input, field) in cases {
            let err = ScienceFilePath::parse(input).unwrap_err();
            assert!(err.has(field), "{input}: expected a {field} error, got {err}");
            assert!(!err.is_semantic_only(), "{input}");
        }
    }

    #[test]
    fn test_parse_accepts_paths() {
        let record =
            ScienceFilePath::parse("imap/swe/l0/2024/01/imap_swe_l0_sci_20240105_v001.pkts").unwrap();
        assert_eq!(record.filename(), "imap_swe_l0_sci_20240105_v001.pkts");
        let local = record.local_path(Path::new("/data"));
        assert_eq!(
            local,
            PathBuf::from("/data/imap/swe/l0/2024/01/imap_swe_l0_sci_20240105_v001.pkts")
        );
    }

    #[test]
    fn test_with_version_leaves_original() {
        let record = ScienceFilePath::parse("imap_swe_l0_sci_20240105_v001.pkts").unwrap();
        let bumped = record.with_version(Version::parse("v002").unwrap());
        assert_eq!(record.version().as_str(), "v001");
        assert_eq!(bumped.filename(), "imap_swe_l0_sci_20240105_v002.pkts");
        assert_eq!(record.product_key(), bumped.product_key());
    }

    #[test]
    fn test_serde_uses_field_form() {
        let record = ScienceFilePath::parse("imap_swe_l0_sci_20240105_v001.pkts").unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["instrument"], "swe");
        assert_eq!(json["start_date"], "20240105");
        assert!(json.get("end_date").is_none());

        let back: ScienceFileRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);

        let bad = serde_json::json!({
            "instrument": "nope", "data_level": "l0", "start_date": "20240105", "version": "v001"
        });
        assert!(serde_json::from_value::<ScienceFileRecord>(bad).is_err());
    }
}
