//! Application version triple.
//!
//! A [`Version`] renders two ways: the display form used in scripts and the
//! marker file (`VERSION 1.2.0`) and a path-safe form (`1_2_0`) used to name
//! per-version staging directories.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VersionFormatError;

/// Token that opens a version header line.
pub const HEADER_TOKEN: &str = "VERSION";
/// Ignorable separator line emitted after each header.
pub const SEPARATOR: &str = "-";

/// Immutable `(major, minor, build)` triple ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u32,
    minor: u32,
    build: u32,
}

impl Version {
    /// Build a version from its components.
    #[must_use]
    pub const fn from_parts(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// Parse the display form `VERSION MAJOR.MINOR.BUILD`.
    ///
    /// Surrounding whitespace is ignored; the token and the number must be
    /// separated by a single space.
    ///
    /// # Errors
    ///
    /// Returns [`VersionFormatError`] when the token is missing or the number
    /// is not three non-negative integers.
    pub fn parse(text: &str) -> Result<Self, VersionFormatError> {
        let trimmed = text.trim();
        let rest = trimmed
            .strip_prefix(HEADER_TOKEN)
            .ok_or_else(|| VersionFormatError::new(text, "missing VERSION token"))?;
        let number = rest
            .strip_prefix(' ')
            .ok_or_else(|| VersionFormatError::new(text, "expected a space after VERSION"))?;
        Self::parse_number(number).map_err(|err| VersionFormatError::new(text, err.reason))
    }

    /// Parse the bare number form `MAJOR.MINOR.BUILD`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionFormatError`] unless the input is exactly three
    /// dot-separated decimal components that fit in `u32`.
    pub fn parse_number(text: &str) -> Result<Self, VersionFormatError> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionFormatError::new(text, "expected three components"));
        }

        let mut components = [0_u32; 3];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(VersionFormatError::new(text, "components must be decimal"));
            }
            *slot = part
                .parse()
                .map_err(|_| VersionFormatError::new(text, "component out of range"))?;
        }

        let [major, minor, build] = components;
        Ok(Self::from_parts(major, minor, build))
    }

    /// Major component.
    #[must_use]
    pub const fn major(self) -> u32 {
        self.major
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(self) -> u32 {
        self.minor
    }

    /// Build component.
    #[must_use]
    pub const fn build(self) -> u32 {
        self.build
    }

    /// Display form, e.g. `VERSION 1.2.0`.
    #[must_use]
    pub fn to_display(self) -> String {
        self.to_string()
    }

    /// Number form, e.g. `1.2.0`.
    #[must_use]
    pub fn number(self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.build)
    }

    /// Path-safe form, e.g. `1_2_0`.
    #[must_use]
    pub fn path_safe(self) -> String {
        format!("{}_{}_{}", self.major, self.minor, self.build)
    }
}

impl Display for Version {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{HEADER_TOKEN} {}.{}.{}",
            self.major, self.minor, self.build
        )
    }
}

/// Accepts either the display form or the bare number form.
impl FromStr for Version {
    type Err = VersionFormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.starts_with(HEADER_TOKEN) {
            Self::parse(trimmed)
        } else {
            Self::parse_number(trimmed)
        }
    }
}

impl TryFrom<String> for Version {
    type Error = VersionFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.number()
    }
}
