//! Ancillary (calibration) files, which carry no data level.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::error::{ErrorSink, Field, ValidationErrors, Violation};
use super::grammar::{
    assign_slots, Extension, Instrument, Slot, ANCILLARY_FIELD_LAYOUT, FIELD_SEPARATOR, MISSION,
};
use super::tokens::{format_date, parse_date, split_time_token, Descriptor, TimeSpan, Version};

const ANCILLARY_CONVENTION: &str =
    "imap_<instrument>_<descriptor>_<start_date>[-<end_date>]_<version>.txt";

const ANCILLARY_DIR: &str = "ancillary";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AncillaryFileRecord {
    instrument: Instrument,
    descriptor: Descriptor,
    span: TimeSpan,
    version: Version,
}

impl AncillaryFileRecord {
    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn start_date(&self) -> NaiveDate {
        self.span.start
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.span.end
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn filename(&self) -> String {
        let parts: Vec<String> = ANCILLARY_FIELD_LAYOUT
            .iter()
            .filter_map(|spec| match spec.slot {
                Slot::Mission => Some(MISSION.to_string()),
                Slot::Instrument => Some(self.instrument.to_string()),
                Slot::Descriptor => Some(self.descriptor.to_string()),
                Slot::Time => Some(self.span.token()),
                Slot::Version => Some(self.version.to_string()),
                Slot::DataLevel => None,
            })
            .collect();
        format!(
            "{}.{}",
            parts.join(&FIELD_SEPARATOR.to_string()),
            Extension::Txt
        )
    }

    /// `imap/ancillary/<instrument>/<filename>`
    pub fn archive_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            MISSION,
            ANCILLARY_DIR,
            self.instrument,
            self.filename()
        )
    }

    pub fn local_path(&self, root: &Path) -> PathBuf {
        root.join(MISSION)
            .join(ANCILLARY_DIR)
            .join(self.instrument.as_str())
            .join(self.filename())
    }
}

impl fmt::Display for AncillaryFileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

/// Parser for ancillary filenames.
pub struct AncillaryFilePath;

impl AncillaryFilePath {
    pub fn parse(input: &str) -> Result<AncillaryFileRecord, ValidationErrors> {
        let name = input.rsplit(['/', '\\']).next().unwrap_or(input);
        let mut sink = ErrorSink::default();

        let Some((stem, extension)) = name.rsplit_once('.') else {
            sink.push(
                Field::Filename,
                Violation::Shape {
                    convention: ANCILLARY_CONVENTION,
                },
            );
            return Err(sink.finish(input));
        };
        if let Some(ext) = sink.check(Extension::parse(extension)) {
            if !ext.is_ancillary() {
                sink.push(
                    Field::Extension,
                    Violation::WrongFormat {
                        value: extension.to_string(),
                        expected: "txt",
                    },
                );
            }
        }

        let tokens: Vec<&str> = stem.split(FIELD_SEPARATOR).collect();
        let Some(slots) = assign_slots(ANCILLARY_FIELD_LAYOUT, &tokens) else {
            sink.push(
                Field::Filename,
                Violation::Shape {
                    convention: ANCILLARY_CONVENTION,
                },
            );
            return Err(sink.finish(input));
        };

        let mut instrument = None;
        let mut descriptor = None;
        let mut start = None;
        let mut end = Some(None);
        let mut version = None;
        for (slot, token) in slots {
            match slot {
                Slot::Mission if token != MISSION => sink.push(
                    Field::Mission,
                    Violation::UnknownValue {
                        value: token.to_string(),
                        allowed: vec![MISSION],
                    },
                ),
                Slot::Mission | Slot::DataLevel => {}
                Slot::Instrument => instrument = sink.check(Instrument::parse(token)),
                Slot::Descriptor => descriptor = sink.check(Descriptor::parse(token)),
                Slot::Time => {
                    let (s, e) = split_time_token(token);
                    start = sink.check(parse_date(Field::StartDate, s));
                    if let Some(e) = e {
                        end = sink.check(parse_date(Field::EndDate, e)).map(Some);
                    }
                }
                Slot::Version => version = sink.check(Version::parse(token)),
            }
        }

        if let (Some(s), Some(Some(e))) = (start, end) {
            if s > e {
                sink.push(
                    Field::EndDate,
                    Violation::StartAfterEnd {
                        start: format_date(s),
                        end: format_date(e),
                    },
                );
            }
        }

        match (instrument, descriptor, start, end, version) {
            (Some(instrument), Some(descriptor), Some(start), Some(end), Some(version))
                if sink.is_empty() =>
            {
                Ok(AncillaryFileRecord {
                    instrument,
                    descriptor,
                    span: TimeSpan {
                        start,
                        end,
                        repointing: None,
                    },
                    version,
                })
            }
            _ => Err(sink.finish(input)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ancillary() {
        let record = AncillaryFilePath::parse("imap_mag_l1b-cal_20240101-20241231_v002.txt").unwrap();
        assert_eq!(record.instrument(), Instrument::Mag);
        assert_eq!(record.descriptor().as_str(), "l1b-cal");
        assert_eq!(record.end_date().map(format_date).as_deref(), Some("20241231"));
        assert_eq!(
            record.archive_path(),
            "imap/ancillary/mag/imap_mag_l1b-cal_20240101-20241231_v002.txt"
        );
        assert_eq!(record.filename(), "imap_mag_l1b-cal_20240101-20241231_v002.txt");
    }

    #[test]
    fn test_single_day_ancillary() {
        let record = AncillaryFilePath::parse("imap_swe_esa-table_20240105_v001.txt").unwrap();
        assert_eq!(record.end_date(), None);
        assert_eq!(
            record.local_path(Path::new("/d")),
            PathBuf::from("/d/imap/ancillary/swe/imap_swe_esa-table_20240105_v001.txt")
        );
    }

    #[test]
    fn test_ancillary_rejections() {
        let err = AncillaryFilePath::parse("imap_mag_cal_20240101_v002.cdf").unwrap_err();
        assert!(err.has(Field::Extension));

        let err = AncillaryFilePath::parse("imap_bad_cal_20241301_v002.txt").unwrap_err();
        assert!(err.has(Field::Instrument));
        assert!(err.has(Field::StartDate));

        let err = AncillaryFilePath::parse("imap_mag_cal_20240201-20240101_v002.txt").unwrap_err();
        assert!(err.is_semantic_only());

        assert!(AncillaryFilePath::parse("imap_mag_20240101_v002.txt").is_err());
    }
}
