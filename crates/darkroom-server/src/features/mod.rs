//! Feature modules implementing the darkroom API
//!
//! Each feature is a vertical CQRS slice: `commands/` for writes,
//! `queries/` for reads, `routes.rs` for the HTTP surface, one file per
//! operation. Handlers are plain async functions taking the state they
//! need plus the command or query; routes translate operation errors
//! into the standard error envelope.
//!
//! - **images**: upload, inspect and delete image jobs; read their
//!   persisted progress events
//! - **stream**: WebSocket feed of live progress events

pub mod images;
pub mod stream;

use axum::Router;

use crate::db::images::ImageStore;
use crate::hub::EventHub;
use crate::pipeline::PipelineLimiter;
use crate::storage::LocalStorage;

/// Shared state for feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub store: ImageStore,
    pub storage: LocalStorage,
    pub hub: EventHub,
    pub limiter: PipelineLimiter,
}

/// The `/api/v1` router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/images", images::images_routes().with_state(state))
}
