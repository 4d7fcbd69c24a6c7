//! Local storage
//!
//! Handles:
//! - Graph snapshots (JSON file)
//! - Profile images (media directory served at `/static`)

mod media;
mod snapshot;

pub use media::{CropBox, MediaStore, jpeg_dimensions, validate_crop};
pub use snapshot::SnapshotStore;
