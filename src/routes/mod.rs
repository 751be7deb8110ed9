use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod home_routes;
pub mod cron_routes;

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "ok": false, "error": "not found" })))
}

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = cron_routes::add_routes(router, state.clone());

    router
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
