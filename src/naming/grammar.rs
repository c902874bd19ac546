//! Vocabularies and field layout of the IMAP filename convention.
//!
//! This module is the single source of truth for which instruments, data
//! levels and extensions exist, how levels are ordered, and in which order
//! fields appear in a filename. Parsing and construction both walk
//! [`FIELD_LAYOUT`], so the two directions cannot drift apart.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{Field, FieldError, Violation};
use super::tokens::Version;

/// Literal mission prefix of every archive filename.
pub const MISSION: &str = "imap";

/// Separator between filename fields.
pub const FIELD_SEPARATOR: char = '_';

/// Separator inside the time field (`start-end`, `start-repointNNNNN`).
pub const TIME_SEPARATOR: char = '-';

/// Human readable form of the science filename convention.
pub const FILENAME_CONVENTION: &str =
    "imap_<instrument>_<data_level>_<descriptor>_<start_date>[-<end_date>|-repoint<NNNNN>]_<version>.<extension>";

/// One slot of the filename layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Mission,
    Instrument,
    DataLevel,
    Descriptor,
    /// Start date plus the optional end date or repointing.
    Time,
    Version,
}

impl Slot {
    pub fn field(&self) -> Field {
        match self {
            Self::Mission => Field::Mission,
            Self::Instrument => Field::Instrument,
            Self::DataLevel => Field::DataLevel,
            Self::Descriptor => Field::Descriptor,
            Self::Time => Field::StartDate,
            Self::Version => Field::Version,
        }
    }
}

/// A slot in the layout together with whether it may be left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub slot: Slot,
    pub optional: bool,
}

/// Ordered fields of a science filename, before the `.<extension>` suffix.
pub const FIELD_LAYOUT: &[FieldSpec] = &[
    FieldSpec { slot: Slot::Mission, optional: false },
    FieldSpec { slot: Slot::Instrument, optional: false },
    FieldSpec { slot: Slot::DataLevel, optional: false },
    FieldSpec { slot: Slot::Descriptor, optional: true },
    FieldSpec { slot: Slot::Time, optional: false },
    FieldSpec { slot: Slot::Version, optional: false },
];

/// Ordered fields of an ancillary (calibration) filename, which has no data level.
pub const ANCILLARY_FIELD_LAYOUT: &[FieldSpec] = &[
    FieldSpec { slot: Slot::Mission, optional: false },
    FieldSpec { slot: Slot::Instrument, optional: false },
    FieldSpec { slot: Slot::Descriptor, optional: false },
    FieldSpec { slot: Slot::Time, optional: false },
    FieldSpec { slot: Slot::Version, optional: false },
];

/// Assign filename tokens to layout slots.
///
/// Optional slots are dropped (left to right) when there are fewer tokens than
/// slots. Returns `None` when the token count cannot fit the layout.
pub fn assign_slots<'a>(layout: &[FieldSpec], tokens: &[&'a str]) -> Option<Vec<(Slot, &'a str)>> {
    let optional = layout.iter().filter(|s| s.optional).count();
    if tokens.len() > layout.len() || tokens.len() + optional < layout.len() {
        return None;
    }

    let mut skip = layout.len() - tokens.len();
    let mut tokens = tokens.iter();
    let mut assigned = Vec::with_capacity(layout.len());
    for spec in layout {
        if spec.optional && skip > 0 {
            skip -= 1;
            continue;
        }
        assigned.push((spec.slot, *tokens.next()?));
    }
    Some(assigned)
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $field:expr, { $($variant:ident => $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every member, in canonical order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            /// Canonical codes, in the same order as [`Self::ALL`].
            pub fn codes() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }

            /// Parse a code, reporting an unknown value against the owning field.
            pub fn parse(code: &str) -> Result<Self, FieldError> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == code)
                    .ok_or_else(|| {
                        FieldError::new(
                            $field,
                            Violation::UnknownValue {
                                value: code.to_string(),
                                allowed: Self::codes(),
                            },
                        )
                    })
            }
        }

        impl FromStr for $name {
            type Err = FieldError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary! {
    /// Instruments flown on IMAP.
    Instrument, Field::Instrument, {
        Codice => "codice",
        Glows => "glows",
        Hi => "hi",
        Hit => "hit",
        Idex => "idex",
        Lo => "lo",
        Mag => "mag",
        Swapi => "swapi",
        Swe => "swe",
        Ultra => "ultra",
    }
}

vocabulary! {
    /// Processing levels, declared in derivation order.
    DataLevel, Field::DataLevel, {
        L0 => "l0",
        L1 => "l1",
        L1a => "l1a",
        L1b => "l1b",
        L1c => "l1c",
        L1ca => "l1ca",
        L1cb => "l1cb",
        L1d => "l1d",
        L2pre => "l2pre",
        L2 => "l2",
        L3 => "l3",
        L3a => "l3a",
        L3b => "l3b",
        L3c => "l3c",
        L3d => "l3d",
    }
}

vocabulary! {
    /// Accepted file suffixes.
    Extension, Field::Extension, {
        Pkts => "pkts",
        Cdf => "cdf",
        Txt => "txt",
    }
}

impl DataLevel {
    /// The rawest level; the only one that may omit a descriptor.
    pub const RAWEST: DataLevel = DataLevel::L0;

    fn rank(&self) -> usize {
        Self::ALL
            .iter()
            .position(|l| l == self)
            .unwrap_or(usize::MAX)
    }

    /// Whether a product at this level can be produced from `source`.
    pub fn can_derive_from(&self, source: DataLevel) -> bool {
        source.rank() < self.rank()
    }

    pub fn is_descriptor_optional(&self) -> bool {
        *self == Self::RAWEST
    }

    /// The only extension a science file at this level may carry.
    pub fn science_extension(&self) -> Extension {
        if *self == Self::L0 {
            Extension::Pkts
        } else {
            Extension::Cdf
        }
    }
}

impl PartialOrd for DataLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl Extension {
    /// Whether this suffix is reserved for ancillary files.
    pub fn is_ancillary(&self) -> bool {
        *self == Self::Txt
    }
}

/// Check the extension of a science file against its data level.
pub fn check_extension(extension: Extension, data_level: DataLevel) -> Result<(), FieldError> {
    let expected = data_level.science_extension();
    if extension == expected {
        Ok(())
    } else {
        Err(FieldError::new(
            Field::Extension,
            Violation::ExtensionLevelMismatch {
                extension: extension.to_string(),
                data_level: data_level.to_string(),
                expected: expected.as_str(),
            },
        ))
    }
}

pub fn is_valid_instrument(code: &str) -> bool {
    Instrument::parse(code).is_ok()
}

pub fn is_valid_data_level(code: &str) -> bool {
    DataLevel::parse(code).is_ok()
}

/// Whether `ext` is an accepted extension for a science file at `data_level`.
pub fn is_valid_extension(ext: &str, data_level: &str) -> bool {
    match (Extension::parse(ext), DataLevel::parse(data_level)) {
        (Ok(ext), Ok(level)) => check_extension(ext, level).is_ok(),
        _ => false,
    }
}

/// Compare two data level codes by derivation order.
pub fn compare_data_levels(a: &str, b: &str) -> Result<Ordering, FieldError> {
    Ok(DataLevel::parse(a)?.cmp(&DataLevel::parse(b)?))
}

/// Compare two version tokens using the default version scheme.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, FieldError> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabularies() {
        assert!(is_valid_instrument("swe"));
        assert!(is_valid_instrument("codice"));
        assert!(!is_valid_instrument("sdc"));
        assert!(!is_valid_instrument("SWE"));

        assert!(is_valid_data_level("l1a"));
        assert!(is_valid_data_level("l2pre"));
        assert!(!is_valid_data_level("l4"));
    }

    #[test]
    fn test_unknown_value_lists_choices() {
        let err = Instrument::parse("sdc").unwrap_err();
        assert_eq!(err.field, Field::Instrument);
        match err.violation {
            Violation::UnknownValue { value, allowed } => {
                assert_eq!(value, "sdc");
                assert_eq!(allowed.len(), Instrument::ALL.len());
                assert!(allowed.contains(&"ultra"));
            }
            other => panic!("unexpected violation: {other:?}"),
        }
    }

    #[test]
    fn test_extension_per_level() {
        assert!(is_valid_extension("pkts", "l0"));
        assert!(!is_valid_extension("cdf", "l0"));
        assert!(is_valid_extension("cdf", "l1a"));
        assert!(!is_valid_extension("pkts", "l2"));
        assert!(!is_valid_extension("txt", "l1"));
        assert!(!is_valid_extension("fits", "l1"));
    }

    #[test]
    fn test_data_level_order() {
        assert_eq!(compare_data_levels("l0", "l1a").unwrap(), Ordering::Less);
        assert_eq!(compare_data_levels("l3", "l2").unwrap(), Ordering::Greater);
        assert_eq!(compare_data_levels("l1b", "l1b").unwrap(), Ordering::Equal);
        assert!(compare_data_levels("l0", "bogus").is_err());

        assert!(DataLevel::L1a.can_derive_from(DataLevel::L0));
        assert!(DataLevel::L2.can_derive_from(DataLevel::L1b));
        assert!(!DataLevel::L1a.can_derive_from(DataLevel::L1a));
        assert!(!DataLevel::L0.can_derive_from(DataLevel::L1));

        let mut levels = vec![DataLevel::L3, DataLevel::L0, DataLevel::L2pre, DataLevel::L2];
        levels.sort();
        assert_eq!(
            levels,
            vec![DataLevel::L0, DataLevel::L2pre, DataLevel::L2, DataLevel::L3]
        );
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("v001", "v002").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("v010", "v002").unwrap(), Ordering::Greater);
        assert!(compare_versions("v1", "v002").is_err());
    }

    #[test]
    fn test_assign_slots_with_and_without_descriptor() {
        let full = ["imap", "swe", "l0", "sci", "20240105", "v001"];
        let slots = assign_slots(FIELD_LAYOUT, &full).unwrap();
        assert_eq!(slots[3], (Slot::Descriptor, "sci"));

        let short = ["imap", "swe", "l0", "20240105", "v001"];
        let slots = assign_slots(FIELD_LAYOUT, &short).unwrap();
        assert_eq!(slots.len(), 5);
        assert_eq!(slots[3], (Slot::Time, "20240105"));

        assert!(assign_slots(FIELD_LAYOUT, &["imap", "swe", "l0", "v001"]).is_none());
        let too_many = ["imap", "swe", "l0", "sci", "x", "20240105", "v001"];
        assert!(assign_slots(FIELD_LAYOUT, &too_many).is_none());
    }
}
