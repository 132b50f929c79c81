use crate::error::{Result, VersionerError};
use std::fmt;
use std::str::FromStr;

/// Three-part version resolved from a commit's place in the branch topology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Patch value given to commits that are not on a release line.
    /// It is the largest value a 16-bit build field can hold.
    pub const UNRELEASABLE_PATCH: u32 = 65535;

    /// Create a new version
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Same major/minor with the given patch
    pub fn with_patch(self, patch: u32) -> Self {
        Version { patch, ..self }
    }

    /// The next minor line, patch reset to 0.
    ///
    /// Fails when the minor is already `u32::MAX`.
    pub fn next_minor(self) -> Result<Self> {
        let minor = self.minor.checked_add(1).ok_or_else(|| {
            VersionerError::version(format!("No minor version follows {}", self))
        })?;
        Ok(Version::new(self.major, minor, 0))
    }

    /// True when the patch is the unreleasable sentinel
    pub fn is_unreleasable(&self) -> bool {
        self.patch == Self::UNRELEASABLE_PATCH
    }

    /// Parse a plain `major.minor.patch` string (e.g. "4.1.8").
    ///
    /// Pre-release and build metadata are rejected: resolved versions never
    /// carry them.
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = semver::Version::parse(text.trim())
            .map_err(|e| VersionerError::version(format!("Invalid version '{}': {}", text, e)))?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(VersionerError::version(format!(
                "Invalid version '{}': pre-release and build metadata are not supported",
                text
            )));
        }

        Ok(Version {
            major: component(parsed.major, "major", text)?,
            minor: component(parsed.minor, "minor", text)?,
            patch: component(parsed.patch, "patch", text)?,
        })
    }
}

fn component(value: u64, name: &str, text: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        VersionerError::version(format!("{} component of '{}' is out of range", name, text))
    })
}

impl FromStr for Version {
    type Err = VersionerError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl From<Version> for semver::Version {
    fn from(v: Version) -> Self {
        semver::Version::new(v.major.into(), v.minor.into(), v.patch.into())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
