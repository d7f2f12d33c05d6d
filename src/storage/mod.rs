//! Local media storage
//!
//! Handles:
//! - Image upload to disk
//! - Public URL generation

mod media;

pub use media::{MEDIA_URL_PREFIX, MediaStorage};
