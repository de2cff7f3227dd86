//! Live progress stream feature
//!
//! WebSocket transport over the event hub. Observers get every event
//! broadcast after they connect; history lives in the audit trail.

pub mod routes;

pub use routes::stream_routes;
