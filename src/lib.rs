//! AI image generation and motivational quotes behind a small HTTP service.
//!
//! Images are generated by the provider, handed to clients as same-origin
//! proxy references, and can be relayed, probed, downloaded or saved per user.
//! Quotes are decorative and always answer, falling back to a fixed quote.

pub mod config;
pub mod error;
pub mod media;
pub mod openai;
pub mod pipeline;
pub mod quote;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Full application router with request tracing and CORS applied.
pub fn app(state: Arc<AppState>) -> Router {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
