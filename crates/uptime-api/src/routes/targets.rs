use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use uptime_core::{Target, TargetView};

use super::MessageResponse;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTargetRequest {
    pub name: String,
    pub url: String,
    #[serde(default = "default_monitor")]
    pub monitor: bool,
}

fn default_monitor() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct MonitorToggleRequest {
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct TargetsResponse {
    pub targets: Vec<TargetView>,
}

#[derive(Serialize)]
pub struct BulkToggleResponse {
    pub enabled: bool,
    pub updated: usize,
}

async fn view(state: &AppState, name: &str) -> Result<TargetView, ApiError> {
    state
        .monitor
        .target(name)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Target '{}' not found", name)))
}

/// GET /api/v1/targets
pub async fn list_targets(State(state): State<AppState>) -> Json<TargetsResponse> {
    Json(TargetsResponse {
        targets: state.monitor.targets().await,
    })
}

/// POST /api/v1/targets
pub async fn create_target(
    State(state): State<AppState>,
    Json(body): Json<CreateTargetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = body.name.trim().to_string();
    state
        .monitor
        .add_target(Target::new(name.clone(), body.url).with_monitor(body.monitor))
        .await?;
    let created = view(&state, &name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/targets/{name}
pub async fn get_target(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TargetView>, ApiError> {
    Ok(Json(view(&state, &name).await?))
}

/// DELETE /api/v1/targets/{name}
pub async fn delete_target(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.monitor.remove_target(&name).await?;
    Ok(Json(MessageResponse {
        message: format!("Target '{}' removed", name),
    }))
}

/// PUT /api/v1/targets/{name}/monitor
pub async fn set_monitored(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<MonitorToggleRequest>,
) -> Result<Json<TargetView>, ApiError> {
    state.monitor.set_target_enabled(&name, body.enabled).await?;
    Ok(Json(view(&state, &name).await?))
}

/// PUT /api/v1/monitor
pub async fn set_all_monitored(
    State(state): State<AppState>,
    Json(body): Json<MonitorToggleRequest>,
) -> Json<BulkToggleResponse> {
    let updated = state.monitor.set_all_enabled(body.enabled).await;
    Json(BulkToggleResponse {
        enabled: body.enabled,
        updated,
    })
}
