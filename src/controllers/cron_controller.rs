use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Deserializer};
use serde_json::json;

use crate::{config::Settings, error::PipelineError, services::orchestrator::RunParams, AppState};

const MAX_HOURS_AGO: i64 = 720;
const MAX_PAGES: usize = 50;
const MAX_FUNDS: usize = 1000;

/// Trigger parameters, accepted from the query string and the JSON body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAlertsParams {
    pub hours_ago: Option<i64>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub test_mode: Option<bool>,
    pub max_pages: Option<usize>,
    pub max_funds_to_check: Option<usize>,
}

impl RunAlertsParams {
    /// Values present in `other` win.
    pub fn overridden_by(self, other: RunAlertsParams) -> Self {
        Self {
            hours_ago: other.hours_ago.or(self.hours_ago),
            test_mode: other.test_mode.or(self.test_mode),
            max_pages: other.max_pages.or(self.max_pages),
            max_funds_to_check: other.max_funds_to_check.or(self.max_funds_to_check),
        }
    }

    pub fn into_run_params(self, settings: &Settings) -> RunParams {
        RunParams {
            hours_ago: self.hours_ago.unwrap_or(24).clamp(1, MAX_HOURS_AGO),
            test_mode: self.test_mode.unwrap_or(false),
            max_pages: self
                .max_pages
                .unwrap_or(settings.default_max_pages)
                .clamp(1, MAX_PAGES),
            max_funds_to_check: self
                .max_funds_to_check
                .unwrap_or(settings.max_funds_to_check)
                .clamp(1, MAX_FUNDS),
        }
    }
}

// query strings carry "true"/"1", JSON bodies carry real booleans
fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
        Number(i64),
    }

    Ok(match Option::<Raw>::deserialize(d)? {
        None => None,
        Some(Raw::Bool(b)) => Some(b),
        Some(Raw::Text(s)) => Some(matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )),
        Some(Raw::Number(n)) => Some(n != 0),
    })
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "ok": false, "error": error }))).into_response()
}

fn status_for(e: &PipelineError) -> StatusCode {
    match e {
        PipelineError::MissingCredentials(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// GET|POST /api/cron/alerts
pub async fn run_alerts(
    State(state): State<AppState>,
    Query(query): Query<RunAlertsParams>,
    body: Bytes,
) -> Response {
    let from_body = if body.iter().all(|b| b.is_ascii_whitespace()) {
        RunAlertsParams::default()
    } else {
        match serde_json::from_slice::<RunAlertsParams>(&body) {
            Ok(p) => p,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid body: {e}")),
        }
    };

    let params = query.overridden_by(from_body).into_run_params(&state.settings);

    match state.orchestrator.run(params).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "alert run aborted");
            error_response(status_for(&e), e.to_string())
        }
    }
}
