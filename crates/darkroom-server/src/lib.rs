//! Darkroom Server Library
//!
//! HTTP server around an image-processing pipeline.
//!
//! # Overview
//!
//! - **Uploads**: multipart image intake with validation, stored as local
//!   artifacts under UUID names
//! - **Pipeline**: sequential pluggable stages driven by an orchestrator,
//!   bounded by a FIFO concurrency limiter
//! - **Live updates**: WebSocket fan-out of progress events through a
//!   broadcast hub
//! - **Persistence**: SQLite via SQLx with embedded migrations; every state
//!   transition is committed before the matching event is broadcast
//!
//! # Architecture
//!
//! The HTTP surface follows a **CQRS (Command Query Responsibility
//! Segregation)** layout: each feature is a vertical slice under `features/`
//! with write operations as commands and reads as queries.
//!
//! Processing happens off the request path: an accepted upload creates a
//! `pending` job record and submits its id to the pipeline limiter. The
//! limiter admits jobs in submission order under a concurrency cap and hands
//! each one to the orchestrator, which drives the stages and publishes
//! progress through the reporter (audit trail first, then the hub).

pub mod api;
pub mod config;
pub mod db;
pub mod features;
pub mod hub;
pub mod middleware;
pub mod pipeline;
pub mod storage;
