//! Numeric build identifiers for platforms that only accept integers.
//!
//! Build numbers are only minted for release-branch commits. Everything else
//! gets `"0"`, which can never be released through such a channel.

use crate::domain::branch::BranchClass;
use crate::domain::version::Version;

/// Build number of any commit that is not on a release branch
pub const UNRELEASABLE_BUILD: &str = "0";

/// Build number for a resolved version on a branch of the given class
pub fn build_number(class: BranchClass, version: Version) -> String {
    match class {
        BranchClass::Release(_) => format_build_number(version),
        BranchClass::Default | BranchClass::Other => UNRELEASABLE_BUILD.to_string(),
    }
}

/// `{major}{minor:02}{patch:06}`, e.g. 4.26.123 -> 426000123.
///
/// Strictly increasing while minor stays below 100 and patch below
/// 1,000,000; wider values are not rejected and simply widen the string.
pub fn format_build_number(version: Version) -> String {
    format!(
        "{}{:02}{:06}",
        version.major, version.minor, version.patch
    )
}
