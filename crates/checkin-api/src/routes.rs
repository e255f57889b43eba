//! Router assembly

use crate::gate::opening_hours_gate;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{MethodRouter, get};
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

/// Path readers post to; the root path is an alias
pub const CHECKIN_PATH: &str = "/api/checkin";

fn checkin_methods() -> MethodRouter<AppState> {
    get(handlers::daily_summary)
        .post(handlers::record_scan)
        .fallback(handlers::connected)
}

/// Build the service router
///
/// The check-in routes sit behind the opening-hours gate; `/health` does not.
pub fn router(state: AppState) -> Router {
    let checkin = Router::new()
        .route(CHECKIN_PATH, checkin_methods())
        .route("/", checkin_methods())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            opening_hours_gate,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(checkin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
