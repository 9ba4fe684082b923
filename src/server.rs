//! HTTP server setup and configuration.
//!
//! This module provides the router and application state used by both
//! the production server and integration tests.

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::models::AppConfig;
use crate::services::{StaticRouteResolver, UrlGenerator};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub generator: Arc<UrlGenerator>,
}

/// Create application state from validated configuration.
///
/// The demo routes are registered in a static resolver so the generator
/// can issue links to them by name; `email.verify` declares itself
/// guarded, which is what allows signed links to target it.
pub fn create_app_state(config: Arc<AppConfig>) -> anyhow::Result<AppState> {
    let resolver = Arc::new(
        StaticRouteResolver::new()
            .register("email.target", "/target/:version/:user_id", false)
            .register("email.verify", "/verify/:version/:user_id", true),
    );
    let generator = Arc::new(UrlGenerator::new(config.clone())?.with_resolver(resolver));
    Ok(AppState { config, generator })
}

/// Build the API router with all endpoints and middleware.
///
/// Routes are mounted under the configured global prefix, so the paths the
/// generator assembles are the paths the router actually serves.
pub fn build_router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/verify/:version/:user_id", get(api::handle_verify))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_signed_url,
        ));

    let api_routes = Router::new()
        .route("/make-url", get(api::handle_make_url))
        .route("/make-signed-url", get(api::handle_make_signed_url))
        .route("/target/:version/:user_id", get(api::handle_target))
        .merge(guarded)
        .with_state(state.clone());

    let prefix = state.config.global_prefix.trim_matches('/');
    let app = if prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(&format!("/{prefix}"), api_routes)
    };

    app.route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
}
