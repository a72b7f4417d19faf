//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod comments;
mod texts;
mod workspaces;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    let cors = build_cors_layer(settings);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        .route("/health", get(health_check))

        // Texts
        .route("/api/texts/create", post(texts::create_text))
        .route("/api/texts/list", post(texts::list_texts))
        .route("/api/texts/update", post(texts::update_text))
        .route("/api/texts/delete", post(texts::delete_text))

        // Comments
        .route("/api/comments/create", post(comments::create_comment))
        .route("/api/comments/list", post(comments::list_comments))
        .route("/api/comments/update", post(comments::update_comment))
        .route("/api/comments/delete", post(comments::delete_comment))

        // Workspaces
        .route("/api/workspaces/tokens", post(workspaces::issue_tokens))
        .route("/api/workspaces/create", post(workspaces::create_workspace))
        .route("/api/workspaces/list", post(workspaces::list_workspaces))
        .route("/api/workspaces/get", post(workspaces::get_workspace))
        .route("/api/workspaces/members/add", post(workspaces::add_member))

        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let layer = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    layer
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
