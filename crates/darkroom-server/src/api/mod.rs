//! Shared API surface types

pub mod response;

pub use response::{ApiResponse, ErrorResponse, ListMeta};
