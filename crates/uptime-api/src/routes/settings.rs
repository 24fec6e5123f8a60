use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use uptime_core::{MonitorConfig, SettingsUpdate};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsResponse {
    pub check_interval_seconds: u64,
    pub alert_cooldown_seconds: u64,
    pub notifications_enabled: bool,
    pub vibration_enabled: bool,
}

impl From<&MonitorConfig> for SettingsResponse {
    fn from(c: &MonitorConfig) -> Self {
        Self {
            check_interval_seconds: c.check_interval_seconds,
            alert_cooldown_seconds: c.alert_cooldown_seconds,
            notifications_enabled: c.notifications_enabled,
            vibration_enabled: c.vibration_enabled,
        }
    }
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    pub check_interval_seconds: Option<u64>,
    pub alert_cooldown_seconds: Option<u64>,
    pub notifications_enabled: Option<bool>,
    pub vibration_enabled: Option<bool>,
}

impl From<SettingsPatch> for SettingsUpdate {
    fn from(p: SettingsPatch) -> Self {
        SettingsUpdate {
            check_interval_seconds: p.check_interval_seconds,
            alert_cooldown_seconds: p.alert_cooldown_seconds,
            notifications_enabled: p.notifications_enabled,
            vibration_enabled: p.vibration_enabled,
        }
    }
}

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let config = state.monitor.config().snapshot().await;
    Json(SettingsResponse::from(&config))
}

/// PATCH /api/v1/settings
pub async fn patch_settings(
    State(state): State<AppState>,
    Json(body): Json<SettingsPatch>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let shared = state.monitor.config();
    shared.apply_settings(body.into()).await?;
    let config = shared.snapshot().await;
    Ok(Json(SettingsResponse::from(&config)))
}
