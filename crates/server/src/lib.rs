use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod regions;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
}

// Uploads are re-checked against the 5 MiB limit in the handler; the body cap
// only has to be large enough for the oversize case to reach it.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    config::record_environment(&state.config);

    let api_router = Router::new()
        .nest("/auth", routes::auth::router())
        .nest("/projects", routes::projects::router())
        .nest("/files", routes::files::router())
        .nest("/messages", routes::messages::router())
        .nest("/comments", routes::comments::router())
        .nest("/versions", routes::versions::router())
        .nest("/tasks", routes::tasks::router())
        .nest("/project-members", routes::project_members::router())
        .nest("/message-context-files", routes::message_context_files::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::origin::origin_guard,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
