/// Project image handling
///
/// - Upload validation (MIME allowlist, 10 MB cap) run before any upload
/// - The `ImageStore` seam the handlers talk to
/// - The Cloudinary implementation of that seam

// Cloudinary REST client
pub mod cloudinary;

// Storage trait, best-effort cleanup helper and the unconfigured fallback
pub mod store;

// Size and MIME checks
pub mod validate;

pub use cloudinary::CloudinaryClient;
pub use store::{discard, project_folder, ClientConfig, ImageStore, StoredImage, UnconfiguredImageStore};
pub use validate::{validate_all, ImageRejection, ImageUpload, ALLOWED_IMAGE_TYPES, MAX_IMAGE_BYTES};
