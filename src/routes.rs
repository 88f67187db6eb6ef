// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{analysis, exams, optical_forms, probes, uploads},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges the exam, optical form, upload and analysis sub-routers.
/// * Applies global middleware (Trace, CORS, upload size limit).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route("/{id}", get(exams::get_exam).delete(exams::delete_exam))
        .route(
            "/{id}/answer-key",
            get(uploads::get_answer_key).post(uploads::upload_answer_key),
        )
        .route("/{id}/responses", post(uploads::upload_responses))
        .route(
            "/{id}/results",
            get(analysis::list_results).delete(analysis::clear_results),
        )
        .route("/{id}/results/{student_id}", get(analysis::get_result))
        .route("/{id}/analysis", get(analysis::get_analysis));

    let optical_form_routes = Router::new()
        .route(
            "/",
            get(optical_forms::list_optical_forms).post(optical_forms::create_optical_form),
        )
        .route(
            "/{id}",
            get(optical_forms::get_optical_form).delete(optical_forms::delete_optical_form),
        );

    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(probes::health))
        .nest("/api/exams", exam_routes)
        .nest("/api/optical-forms", optical_form_routes)
        // Global Middleware (applied from outside in)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
