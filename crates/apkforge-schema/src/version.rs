//! Interpreter version parsing.
//!
//! `python3 --version` prints `Python 3.11.4`, but distributions also ship
//! `3.12` or `3.13.0rc1` style strings. Versions are normalised into
//! [`semver::Version`] so comparisons stay numeric.

use regex::Regex;
use semver::Version;
use thiserror::Error;

/// Oldest interpreter the packaging tool supports (major.minor).
pub const MIN_INTERPRETER: (u64, u64) = (3, 8);

/// Errors returned when a version string cannot be understood.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    /// No `X.Y` pattern anywhere in the input.
    #[error("no version number found in {0:?}")]
    NotFound(String),

    /// A component overflowed or was otherwise unusable.
    #[error("invalid version {0:?}")]
    Invalid(String),
}

/// Parse the first `X.Y[.Z]` found in `raw` into a semantic version.
///
/// A missing patch component is treated as zero; any suffix (`rc1`, `+`) is
/// ignored.
///
/// # Example
///
/// ```
/// use apkforge_schema::version::parse_lenient;
///
/// let v = parse_lenient("Python 3.10.12").unwrap();
/// assert_eq!((v.major, v.minor, v.patch), (3, 10, 12));
/// assert_eq!(parse_lenient("Python 3.12").unwrap().patch, 0);
/// ```
pub fn parse_lenient(raw: &str) -> Result<Version, VersionError> {
    let re = Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?")
        .map_err(|_| VersionError::Invalid(raw.trim().to_string()))?;
    let caps = re
        .captures(raw)
        .ok_or_else(|| VersionError::NotFound(raw.trim().to_string()))?;

    let component = |idx: usize| -> Result<u64, VersionError> {
        caps.get(idx).map_or(Ok(0), |m| {
            m.as_str()
                .parse::<u64>()
                .map_err(|_| VersionError::Invalid(raw.trim().to_string()))
        })
    };

    Ok(Version::new(component(1)?, component(2)?, component(3)?))
}

/// Major.minor comparison against a minimum; the patch level never matters.
pub fn meets_minimum(version: &Version, minimum: (u64, u64)) -> bool {
    (version.major, version.minor) >= minimum
}

/// Parse a `major.minor` requirement such as `"3.8"` from configuration.
pub fn parse_minimum(raw: &str) -> Result<(u64, u64), VersionError> {
    let version = parse_lenient(raw)?;
    Ok((version.major, version.minor))
}
