use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Liveness only; the database is not probed.
#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub storage: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is up, with the storage backend it runs on", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let data = HealthData {
        status: "ok".into(),
        storage: state.config.storage.as_str().into(),
        version: env!("CARGO_PKG_VERSION").into(),
    };
    Json(ApiResponse::success("Health check", data, Some(Meta::empty())))
}
