//! Image queries

pub mod get_image;
pub mod list_events;
pub mod list_images;

pub use get_image::{GetImageError, GetImageQuery};
pub use list_events::{ListEventsError, ListEventsQuery, ListEventsResponse};
pub use list_images::{ListImagesError, ListImagesQuery, ListImagesResponse};
