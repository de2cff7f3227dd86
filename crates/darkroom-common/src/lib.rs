//! Darkroom Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared infrastructure for the darkroom workspace:
//!
//! - **Error Handling**: shared error and result types
//! - **Checksums**: artifact integrity digests
//! - **Logging**: tracing initialization used by every binary
//!
//! # Example
//!
//! ```no_run
//! use darkroom_common::checksum::sha256_file;
//! use darkroom_common::Result;
//!
//! fn verify(path: &str) -> Result<()> {
//!     let digest = sha256_file(path)?;
//!     println!("sha256: {digest}");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
