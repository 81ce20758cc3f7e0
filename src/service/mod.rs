//! Service layer: state shared between tools and resources.

pub mod uploads;

pub use uploads::{UploadStore, UploadedFile};
