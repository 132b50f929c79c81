//! Domain logic - pure rules over versions, branch names and commit ids,
//! independent of any history provider

pub mod branch;
pub mod commit;
pub mod version;

pub use branch::{BranchClass, ReleaseBranchMatcher};
pub use commit::same_commit;
pub use version::Version;
