use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use uptime_core::{SchedulerState, TransitionEvent};

use super::MessageResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SummaryResponse {
    pub online: usize,
    pub monitored: usize,
    pub problems: usize,
    pub headline: String,
    pub scheduler: SchedulerState,
    pub last_sweep: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SchedulerResponse {
    pub state: SchedulerState,
    pub changed: bool,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<TransitionEvent>,
}

/// GET /api/v1/summary
pub async fn summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let monitor = &state.monitor;
    let s = monitor.summary().await;
    Json(SummaryResponse {
        online: s.online,
        monitored: s.monitored,
        problems: s.problems,
        headline: s.headline(),
        scheduler: monitor.state().await,
        last_sweep: monitor.last_sweep().await,
        created_at: monitor.created_at(),
    })
}

/// POST /api/v1/refresh
///
/// The sweep runs in the background; poll `/summary` or `/targets` for results.
pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    // Detached: the handle is not awaited.
    let _ = state.monitor.refresh_now();
    (
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Refresh started".into(),
        }),
    )
}

/// POST /api/v1/scheduler/start
pub async fn start(State(state): State<AppState>) -> Json<SchedulerResponse> {
    let changed = state.monitor.start().await;
    Json(SchedulerResponse {
        state: state.monitor.state().await,
        changed,
    })
}

/// POST /api/v1/scheduler/stop
pub async fn stop(State(state): State<AppState>) -> Json<SchedulerResponse> {
    let changed = state.monitor.stop().await;
    Json(SchedulerResponse {
        state: state.monitor.state().await,
        changed,
    })
}

/// GET /api/v1/events
pub async fn events(State(state): State<AppState>) -> Json<EventsResponse> {
    Json(EventsResponse {
        events: state.monitor.events().await,
    })
}
