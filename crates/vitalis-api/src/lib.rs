//! HTTP surface of the Vitalis server: handlers, auth middleware and the
//! router that ties them together.

pub mod auth;
pub mod chat;
pub mod doctor;
pub mod error;
pub mod extract;
pub mod files;
pub mod middleware;
pub mod patient;
pub mod reports;
pub mod roster;
pub mod storage;
pub mod vitals;
pub mod voice;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::services::ServeDir;

use crate::auth::AppState;
use crate::files::UPLOAD_BODY_LIMIT;
use crate::middleware::require_auth;

/// GET /
pub async fn health() -> Json<Value> {
    Json(json!({ "All": "Clear.", "Go": "Ahead." }))
}

/// Every route of the API. Cross-cutting layers (CORS, tracing) are left to
/// the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(health))
        .route("/api", post(voice::extract_voice_form))
        .route("/auth/login", post(auth::login))
        .route("/doctor/signup", post(doctor::signup))
        .route("/patient/signup", post(patient::signup))
        .route(
            "/audio/upload",
            post(files::upload_audio).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .nest_service("/uploads", ServeDir::new(state.storage.dir()));

    let protected_routes = Router::new()
        .route("/auth/get-details", post(auth::get_details))
        // Doctor
        .route("/doctor/addpatient", post(doctor::add_patient))
        .route("/doctor/allpatient", post(roster::all_patients))
        .route("/doctor/get-details", post(doctor::overview))
        .route("/doctor/adddrugpatient", post(doctor::add_visit))
        .route("/doctor/getinfo/{mobile}", post(doctor::patient_info))
        .route("/doctor/patient-drug-data/mobile/{mobile}", post(doctor::visit_history))
        // Patient
        .route("/patient/add", post(patient::add_visit))
        .route("/patient/get-daily-data", post(patient::history))
        .route("/patient/validate-token", post(patient::validate_token))
        // Chat
        .route("/chat/send-text", post(chat::send_text))
        .route(
            "/chat/send-audio",
            post(chat::send_audio).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/chat/get-texts", post(chat::get_texts))
        // Reports
        .route(
            "/reports/upload/{patient_id}",
            post(reports::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/reports/{patient_id}", get(reports::consolidated))
        .route("/reports/report/{report_id}", get(reports::single))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
