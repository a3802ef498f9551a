/// Portfolio projects
///
/// Projects with their images (stored remotely, referenced by public id) and
/// tags. The storage layer owns ordering and cascades; remote asset cleanup is
/// left to the caller.

pub mod storage;
pub mod types;

pub use storage::ProjectStorage;
pub use types::{NewImage, NewProject, PatchOutcome, Project, ProjectImage, ProjectPatch};
