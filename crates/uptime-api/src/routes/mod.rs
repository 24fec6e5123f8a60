mod notifications;
mod scheduler;
mod settings;
mod targets;

use axum::routing::{get, post, put};
use axum::Router;
use serde::Serialize;

use crate::state::AppState;

pub use settings::{SettingsPatch, SettingsResponse};
pub use targets::{CreateTargetRequest, MonitorToggleRequest};

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(scheduler::summary))
        .route("/refresh", post(scheduler::refresh))
        .route("/scheduler/start", post(scheduler::start))
        .route("/scheduler/stop", post(scheduler::stop))
        .route("/events", get(scheduler::events))
        .route(
            "/targets",
            get(targets::list_targets).post(targets::create_target),
        )
        .route(
            "/targets/{name}",
            get(targets::get_target).delete(targets::delete_target),
        )
        .route("/targets/{name}/monitor", put(targets::set_monitored))
        .route("/monitor", put(targets::set_all_monitored))
        .route(
            "/settings",
            get(settings::get_settings).patch(settings::patch_settings),
        )
        .route("/notifications/test", post(notifications::send_test))
}
