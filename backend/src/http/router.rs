//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::status))
        .route("/diagnose", get(handlers::diagnose))
        .route(
            "/professionals",
            get(handlers::get_professionals)
                .post(handlers::create_professional)
                .put(handlers::update_professional)
                .delete(handlers::delete_professional),
        )
        .route(
            "/activity-types",
            get(handlers::get_activity_types)
                .post(handlers::create_activity_type)
                .put(handlers::update_activity_type)
                .delete(handlers::delete_activity_type),
        )
        .route(
            "/time-slots",
            get(handlers::get_time_slots)
                .post(handlers::create_time_slot)
                .put(handlers::update_time_slot)
                .delete(handlers::delete_time_slot),
        )
        .route(
            "/schedules",
            get(handlers::get_schedules)
                .post(handlers::create_schedule)
                .put(handlers::update_schedule)
                .delete(handlers::delete_schedule),
        )
        .route("/schedules/{weekday}", get(handlers::get_schedules_by_day));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
