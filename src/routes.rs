// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempt, auth, exam, profile},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exams, attempts, user, leaderboard, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, services, config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(require_auth.clone()),
        );

    let exam_routes = Router::new()
        .route("/", get(exam::list_exams))
        .route("/{id}", get(exam::get_exam));

    let attempt_routes = Router::new()
        .route("/", post(attempt::start_attempt))
        .route(
            "/{id}",
            get(attempt::get_attempt).put(attempt::update_attempt),
        )
        .route("/{id}/answers", post(attempt::record_answer))
        .route("/{id}/timer", get(attempt::get_timer))
        .route("/{id}/review", get(attempt::get_review))
        .layer(require_auth.clone());

    let user_routes = Router::new()
        .route("/exam-attempts", get(attempt::list_my_attempts))
        .route("/stats", get(profile::get_my_stats))
        .layer(require_auth.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/exams", post(admin::create_exam))
        // Auth first, then Admin check
        .layer(
            ServiceBuilder::new()
                .layer(require_auth)
                .layer(middleware::from_fn(admin_middleware)),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/exam-attempts", attempt_routes)
        .nest("/api/user", user_routes)
        .route("/api/leaderboard", get(profile::get_leaderboard))
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
