pub mod assignments;
pub mod calendar;
pub mod error;
pub mod extract;
pub mod images;
pub mod khatmahs;
pub mod ownership;
pub mod participants;
pub mod qibla;
pub mod quran;
pub mod state;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Request bodies above this are cut off before the image size check can
/// produce a proper error, so it sits a little above the image cap.
const BODY_LIMIT: usize = images::MAX_IMAGE_SIZE + 1024 * 1024;

/// All API routes plus the `/media` file tree.
pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(&state.media_dir);

    Router::new()
        .route("/home/", get(home))
        .route("/health", get(health))
        // Khatmahs
        .route("/khatmahs/", get(khatmahs::list_khatmahs).post(khatmahs::create_khatmah))
        .route(
            "/khatmahs/{id}/",
            get(khatmahs::get_khatmah)
                .put(khatmahs::replace_khatmah)
                .patch(khatmahs::patch_khatmah)
                .delete(khatmahs::delete_khatmah),
        )
        .route("/khatmahs/{id}/join/", post(khatmahs::join_khatmah))
        .route("/khatmahs/{id}/remove_participant/", post(khatmahs::remove_participant))
        // Participants
        .route("/participants/", get(participants::list_participants))
        .route("/participants/{id}/", get(participants::get_participant))
        // Assignments
        .route(
            "/assignments/",
            get(assignments::list_juz_assignments).post(assignments::create_juz_assignment),
        )
        .route("/assignments/{id}/", get(assignments::get_juz_assignment))
        .route(
            "/assignments/{id}/toggle_complete/",
            post(assignments::toggle_juz_assignment),
        )
        .route(
            "/surah-assignments/",
            get(assignments::list_surah_assignments).post(assignments::create_surah_assignment),
        )
        .route("/surah-assignments/{id}/", get(assignments::get_surah_assignment))
        .route(
            "/surah-assignments/{id}/toggle_complete/",
            post(assignments::toggle_surah_assignment),
        )
        // Hijri calendar
        .route("/hijri-months/", get(calendar::list_months))
        .route("/hijri-months/current/", get(calendar::current_month_handler))
        .route("/hijri-months/by_number/", get(calendar::month_by_number))
        .route("/hijri-months/by_name/", get(calendar::month_by_name))
        .route("/hijri-months/{id}/", get(calendar::get_month))
        .route("/hijri-events/", get(calendar::list_events))
        .route("/hijri-events/by_month/", get(calendar::events_by_month))
        .route("/astronomical-events/", get(calendar::list_astronomical_events))
        .route(
            "/astronomical-events/by_month/",
            get(calendar::astronomical_events_by_month),
        )
        .route("/hijri-calendar/", get(calendar::hijri_calendar))
        // Tools
        .route("/qibla/{lat}/{lon}/", get(qibla::qibla))
        .route("/juz/{n}/text/", get(quran::get_juz_text))
        .nest_service("/media", media)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to Quran Khatmah API!" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
