//! Version decision primitives.
//!
//! Release versions are small immutable value types with a total order.
//! The wire format is `vMAJOR.MINOR.PATCH`, optionally suffixed with a
//! `-pre.N` pre-release ordinal. A final release orders after every
//! pre-release of the same triple.

use crate::error::VersionError;
use std::cmp::Ordering;
use std::fmt;

/// A parsed release version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
    /// Pre-release ordinal (`pre.N`), absent for final releases
    pub pre: Option<u64>,
}

impl ReleaseVersion {
    /// Construct a final release version.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parse a version string of the form `vX.Y.Z` or `vX.Y.Z-pre.N`.
    ///
    /// Parsing is strict: a missing `v` prefix, a missing component, build
    /// metadata, or a pre-release token other than `pre.N` (N >= 1) is an
    /// error, never a silent default.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let malformed = |reason: &str| VersionError::Malformed {
            version: input.to_string(),
            reason: reason.to_string(),
        };

        let bare = input
            .strip_prefix('v')
            .ok_or_else(|| malformed("missing 'v' prefix"))?;
        let parsed = semver::Version::parse(bare).map_err(|e| malformed(&e.to_string()))?;
        if !parsed.build.is_empty() {
            return Err(malformed("build metadata is not allowed"));
        }

        let pre = if parsed.pre.is_empty() {
            None
        } else {
            let ordinal = parsed
                .pre
                .as_str()
                .strip_prefix("pre.")
                .ok_or_else(|| malformed("pre-release token must be of the form pre.N"))?;
            let n: u64 = ordinal
                .parse()
                .map_err(|_| malformed("pre-release ordinal is not a number"))?;
            if n == 0 {
                return Err(malformed("pre-release ordinal must be positive"));
            }
            Some(n)
        };

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre,
        })
    }

    /// The next minor version: minor incremented, patch zeroed, no
    /// pre-release. Major and patch bumps are never auto-selected.
    pub fn next_minor(&self) -> Self {
        Self::new(self.major, self.minor + 1, 0)
    }

    /// Whether this is a final release (no pre-release ordinal).
    pub fn is_final(&self) -> bool {
        self.pre.is_none()
    }

    /// The major.minor.patch triple with any pre-release stripped.
    pub fn triple(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre, other.pre) {
                // A final release supersedes its pre-releases.
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            })
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(n) = self.pre {
            write!(f, "-pre.{}", n)?;
        }
        Ok(())
    }
}

/// Compute the next minor version string, e.g. `"v1.4.2"` -> `"v1.5.0"`.
pub fn next_minor(version: &str) -> Result<String, VersionError> {
    Ok(ReleaseVersion::parse(version)?.next_minor().to_string())
}
