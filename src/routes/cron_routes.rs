use axum::{Router, middleware::from_fn_with_state, routing::get};
use crate::{AppState, controllers::cron_controller};

pub fn add_routes(router: Router<AppState>, state: AppState) -> Router<AppState> {
    let cron = Router::<AppState>::new()
        .route(
            "/api/cron/alerts",
            get(cron_controller::run_alerts).post(cron_controller::run_alerts),
        )
        .route_layer(from_fn_with_state(state, crate::auth::require_cron_secret));

    router.merge(cron)
}
