use axum::extract::State;
use axum::Json;

use uptime_core::DeliverySummary;

use crate::state::AppState;

/// POST /api/v1/notifications/test
pub async fn send_test(State(state): State<AppState>) -> Json<DeliverySummary> {
    Json(state.notifier.send_test().await)
}
