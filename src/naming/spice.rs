//! SPICE kernels, recognised by suffix and filed by kernel type.

use std::fmt;
use std::path::{Path, PathBuf};

use super::error::{ErrorSink, Field, ValidationErrors, Violation};
use super::grammar::MISSION;

const SPICE_DIR: &str = "spice";

/// NAIF kernel families, each stored in its own directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelType {
    Ck,
    Fk,
    Lsk,
    Mk,
    Pck,
    Sclk,
    Spk,
}

/// Suffix to kernel type.
const KERNEL_SUFFIXES: &[(&str, KernelType)] = &[
    ("bc", KernelType::Ck),
    ("bpc", KernelType::Pck),
    ("bsp", KernelType::Spk),
    ("tf", KernelType::Fk),
    ("tls", KernelType::Lsk),
    ("tm", KernelType::Mk),
    ("tpc", KernelType::Pck),
    ("tsc", KernelType::Sclk),
];

impl KernelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ck => "ck",
            Self::Fk => "fk",
            Self::Lsk => "lsk",
            Self::Mk => "mk",
            Self::Pck => "pck",
            Self::Sclk => "sclk",
            Self::Spk => "spk",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let suffix = suffix.to_ascii_lowercase();
        KERNEL_SUFFIXES
            .iter()
            .find(|(s, _)| *s == suffix)
            .map(|(_, kind)| *kind)
    }

    pub fn suffixes() -> Vec<&'static str> {
        KERNEL_SUFFIXES.iter().map(|(s, _)| *s).collect()
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a filename carries a SPICE kernel suffix.
pub fn is_spice_filename(name: &str) -> bool {
    name.rsplit_once('.')
        .and_then(|(_, suffix)| KernelType::from_suffix(suffix))
        .is_some()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpiceFile {
    filename: String,
    kernel_type: KernelType,
}

impl SpiceFile {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kernel_type(&self) -> KernelType {
        self.kernel_type
    }

    /// `imap/spice/<kernel type>/<filename>`
    pub fn archive_path(&self) -> String {
        format!("{}/{}/{}/{}", MISSION, SPICE_DIR, self.kernel_type, self.filename)
    }

    pub fn local_path(&self, root: &Path) -> PathBuf {
        root.join(MISSION)
            .join(SPICE_DIR)
            .join(self.kernel_type.as_str())
            .join(&self.filename)
    }
}

impl fmt::Display for SpiceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename)
    }
}

pub struct SpiceFilePath;

impl SpiceFilePath {
    /// Kernel names are not otherwise constrained; only the suffix is checked.
    pub fn parse(input: &str) -> Result<SpiceFile, ValidationErrors> {
        let name = input.rsplit(['/', '\\']).next().unwrap_or(input);
        let mut sink = ErrorSink::default();

        match name.rsplit_once('.') {
            Some((stem, suffix)) if !stem.is_empty() => match KernelType::from_suffix(suffix) {
                Some(kernel_type) => {
                    return Ok(SpiceFile {
                        filename: name.to_string(),
                        kernel_type,
                    })
                }
                None => sink.push(
                    Field::Extension,
                    Violation::UnknownValue {
                        value: suffix.to_string(),
                        allowed: KernelType::suffixes(),
                    },
                ),
            },
            _ => sink.push(
                Field::Filename,
                Violation::Shape {
                    convention: "<name>.<kernel suffix>",
                },
            ),
        }
        Err(sink.finish(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_directories() {
        let cases = [
            ("imap_2025_100_2025_101_001.ah.bc", "ck"),
            ("de440.bsp", "spk"),
            ("naif0012.tls", "lsk"),
            ("imap_science_0001.tf", "fk"),
            ("imap_sclk_0000.tsc", "sclk"),
            ("pck00011.tpc", "pck"),
            ("earth_latest_high_prec.bpc", "pck"),
            ("imap_2025_v001.tm", "mk"),
        ];
        for (name, dir) in cases {
            let file = SpiceFilePath::parse(name).unwrap();
            assert_eq!(file.kernel_type().as_str(), dir, "{name}");
            assert_eq!(file.archive_path(), format!("imap/spice/{dir}/{name}"));
        }
    }

    #[test]
    fn test_non_kernel_rejected() {
        let err = SpiceFilePath::parse("readme.md").unwrap_err();
        assert!(err.has(Field::Extension));
        assert!(SpiceFilePath::parse(".bsp").is_err());
        assert!(!is_spice_filename("imap_swe_l0_sci_20240105_v001.pkts"));
        assert!(is_spice_filename("de440.BSP"));
    }
}
