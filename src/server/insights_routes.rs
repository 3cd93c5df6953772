//! HTTP routes for insight scans, mounted under `/api/insights`.

use super::state::{GuardedInsightsService, ServerState};
use crate::insights::InsightsError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Envelope shared by every insights response.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                message: None,
            }),
        )
            .into_response()
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            message: Some(message.into()),
        }),
    )
        .into_response()
}

impl IntoResponse for InsightsError {
    fn into_response(self) -> Response {
        match self {
            InsightsError::InvalidTarget(reason) => api_error(StatusCode::BAD_REQUEST, reason),
            InsightsError::Store(e) => {
                error!("Insights store error: {:#}", e);
                super::metrics::record_error("store", "insights");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StartScanBody {
    #[serde(default)]
    target_url: String,
}

async fn start_scan(
    State(insights): State<GuardedInsightsService>,
    Query(query): Query<UserQuery>,
    Json(body): Json<StartScanBody>,
) -> Response {
    match insights.start_scan(query.user_id, &body.target_url) {
        Ok(job) => ApiResponse::ok(job),
        Err(e) => e.into_response(),
    }
}

async fn get_dashboard(
    State(insights): State<GuardedInsightsService>,
    Path(job_id): Path<i64>,
) -> Response {
    match insights.get_dashboard(job_id) {
        Ok(Some(dashboard)) => ApiResponse::ok(dashboard),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "Job not found"),
        Err(e) => e.into_response(),
    }
}

async fn get_user_jobs(
    State(insights): State<GuardedInsightsService>,
    Query(query): Query<UserQuery>,
) -> Response {
    match insights.get_user_jobs(query.user_id) {
        Ok(jobs) => ApiResponse::ok(jobs),
        Err(e) => e.into_response(),
    }
}

pub fn make_insights_routes(state: ServerState) -> Router {
    Router::new()
        .route("/scan", post(start_scan))
        .route("/dashboard/{job_id}", get(get_dashboard))
        .route("/jobs", get(get_user_jobs))
        .with_state(state)
}
