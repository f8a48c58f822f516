// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, profile, quiz, record},
    state::AppState,
    utils::session::auth_middleware,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Public routes: signup, login, logout, records, other users' profiles.
/// * Everything else sits behind the session guard.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let guard = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes).post(quiz::create_quiz))
        .route("/{id}", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/{id}/submit", post(quiz::submit_quiz))
        .route("/{id}/questions", post(quiz::add_question))
        .layer(guard.clone());

    let record_routes = Router::new().route("/", get(record::list_records));

    let profile_routes = Router::new()
        .merge(
            Router::new()
                .route("/", get(profile::get_me))
                .route("/info", put(profile::change_info))
                .route("/password", put(profile::change_password))
                .layer(guard),
        )
        .route("/{id}", get(profile::get_profile));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/records", record_routes)
        .nest("/api/profile", profile_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_origins)),
        )
        .with_state(state)
}
