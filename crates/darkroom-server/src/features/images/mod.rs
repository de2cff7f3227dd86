//! Images feature module
//!
//! Upload queues a job for the pipeline; reads expose the record, its
//! artifact URLs and the persisted progress trail; delete removes the
//! record together with its artifacts.

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

#[cfg(test)]
mod routes_test;

pub use routes::images_routes;
