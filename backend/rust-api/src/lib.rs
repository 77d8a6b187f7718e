use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/mcp", mcp_routes().layer(cors))
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn mcp_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/skills", get(handlers::mcp::list_skills))
        .route("/lesson/generate", post(handlers::mcp::generate_lesson))
        .route("/lesson/narrate", post(handlers::mcp::narrate_lesson))
        .route("/quiz/generate", post(handlers::mcp::generate_quiz))
        .route("/quiz/submit", post(handlers::mcp::submit_quiz))
        .route("/progress/{user_id}", get(handlers::mcp::get_progress))
        .route("/stats/{user_id}", get(handlers::mcp::get_stats))
}
