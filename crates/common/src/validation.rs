//! Schema validation for decoded request bodies.
//!
//! Validation turns a raw request into a typed value ([`CoreVersion`],
//! [`Region`]) so that handlers can only build command lines from input that
//! has already been checked.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::protocol::{CoreUpdateRequest, GeofilesRequest};

static CORE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v[0-9]+\.[0-9]+\.[0-9]+$").expect("static regex"));

/// A request body that decoded cleanly but violates its schema.
///
/// The `Display` output is returned verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("core_version is required")]
    CoreVersionRequired,

    #[error("core_version must match pattern vX.X.X")]
    CoreVersionFormat,

    #[error("region is required (iran, russia, china)")]
    RegionRequired,

    /// Carries the value exactly as submitted, before lower-casing.
    #[error("Unsupported region {0}")]
    UnsupportedRegion(String),
}

// ---------------------------------------------------------------------------
// Core version
// ---------------------------------------------------------------------------

/// A version string of the form `v<major>.<minor>.<patch>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreVersion(String);

impl CoreVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CoreVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::CoreVersionRequired);
        }
        if !CORE_VERSION_RE.is_match(s) {
            return Err(ValidationError::CoreVersionFormat);
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for CoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl CoreUpdateRequest {
    /// Check `core_version`: emptiness first, then the `vX.Y.Z` shape.
    pub fn validate(&self) -> Result<CoreVersion, ValidationError> {
        self.core_version.parse()
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// Regions for which the maintenance tool ships geofiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Iran,
    Russia,
    China,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Iran, Region::Russia, Region::China];

    /// Lower-case name, as used in the command-line flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Iran => "iran",
            Region::Russia => "russia",
            Region::China => "china",
        }
    }

    /// Command-line flag selecting this region, e.g. `--russia`.
    pub fn flag(self) -> String {
        format!("--{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::RegionRequired);
        }
        let lowered = s.to_lowercase();
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == lowered)
            .ok_or_else(|| ValidationError::UnsupportedRegion(s.to_owned()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GeofilesRequest {
    /// Check `region`: emptiness first, then case-insensitive membership.
    pub fn validate(&self) -> Result<Region, ValidationError> {
        self.region.parse()
    }
}
