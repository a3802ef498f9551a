/// Project tags
///
/// Tags are created implicitly when assigned to a project, and can be renamed
/// or deleted from the admin area. Deleting a tag detaches it from every
/// project without touching the projects.

pub mod storage;
pub mod types;

pub use storage::{normalize_tag_names, resolve_tag_ids, RenameOutcome, TagStorage};
pub use types::{Tag, TagSummary};
