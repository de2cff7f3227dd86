//! Image commands

pub mod delete;
pub mod upload;

pub use delete::{DeleteImageCommand, DeleteImageError, DeleteImageResponse};
pub use upload::{UploadImageCommand, UploadImageError, UploadImageResponse};
