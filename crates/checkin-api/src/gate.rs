//! Opening-hours gate
//!
//! Reader requests outside the daily window are answered with the closed
//! payload before any handler or database access runs.

use crate::response::CheckinResponse;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

pub async fn opening_hours_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let now = state.clock.now();
    if !state.settings.hours.is_open(now.time()) {
        debug!(
            method = %request.method(),
            now = %now,
            open = %state.settings.hours.open,
            close = %state.settings.hours.close,
            "request outside opening hours"
        );
        return CheckinResponse::closed().into_response();
    }

    next.run(request).await
}
