//! HTTP middleware
//!
//! CORS built from configuration plus request tracing.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::CorsConfig;

/// Create the CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age_secs));

    let allow_any =
        config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*");
    if allow_any {
        cors = cors.allow_origin(Any);
    } else {
        let mut origins: Vec<HeaderValue> = Vec::with_capacity(config.allowed_origins.len());
        for origin in &config.allowed_origins {
            match origin.parse() {
                Ok(value) => origins.push(value),
                Err(_) => tracing::warn!("skipping malformed CORS origin {origin:?}"),
            }
        }
        cors = cors.allow_origin(origins);
    }

    // a wildcard origin cannot carry credentials
    if config.allow_credentials && !allow_any {
        cors = cors.allow_credentials(true);
    }

    cors
}

/// Per-request tracing: a span per request, a debug line on arrival and an
/// info line with latency once the response is sent.
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Millis),
        )
}
