//! Check-in endpoint handlers.

use crate::error::ApiError;
use crate::messages::ResponseMessages;
use crate::response::CheckinResponse;
use crate::state::AppState;
use crate::validation::{FormData, GET_RULES, POST_RULES};
use axum::Json;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use checkin_core::constants::SCAN_EVENTS_TABLE;
use checkin_core::day_key;
use checkin_storage::repositories::{
    ScanEventRepository, SqliteScanEventRepository, SqliteUserRepository, UserRepository,
};
use checkin_storage::{BindParameter, daily_meters, rank_of};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Field whose presence switches a POST to dev mode
const DEV_FIELD: &str = "dev";

/// `tag_id` value a summary lookup treats as absent
const NO_TAG: &str = "0";

/// Record one reader scan
///
/// With a `dev` field the prepared parameters are echoed back and nothing
/// is written. Unknown tags are recorded against user `0` with a warning.
pub async fn record_scan(
    State(state): State<AppState>,
    form: Result<Form<FormData>, FormRejection>,
) -> Result<CheckinResponse, ApiError> {
    let form = form.map(|Form(form)| form).unwrap_or_else(|rejection| {
        debug!(error = %rejection, "unreadable form body");
        FormData::new()
    });
    let dev = form.contains_key(DEV_FIELD);

    let mut params = if dev {
        POST_RULES.prepare_lenient(&form)
    } else {
        POST_RULES.check_keys(&form)?;
        POST_RULES.prepare(&form)?
    };

    let tag = form
        .get("tag_id")
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    let db = state.database.db();
    let owner = SqliteUserRepository::new(db.clone())
        .find_user_id_by_tag(&tag)
        .await
        .map_err(ApiError::RecordFailed)?;
    params.push(BindParameter::int("user_id", owner.get()));

    let response = if dev {
        debug!(tag = %tag, "dev request, nothing recorded");
        CheckinResponse::dev_echo(form, params)
    } else {
        let handle = db
            .insert(SCAN_EVENTS_TABLE, &params)
            .await
            .map_err(ApiError::RecordFailed)?;
        let id = handle.map_or(0, |h| h.last_insert_id());
        info!(tag = %tag, user_id = %owner, id, "scan recorded");
        CheckinResponse::recorded(id)
    };

    if owner.is_unknown() {
        warn!(tag = %tag, "scan from a tag without owner");
        return Ok(response.with_warning(ResponseMessages::CHECK_TAG));
    }
    Ok(response)
}

/// Today's meters and overall rank of a tag's owner
pub async fn daily_summary(
    State(state): State<AppState>,
    query: Result<Query<FormData>, QueryRejection>,
) -> Result<CheckinResponse, ApiError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let literal = query.get("tag_id").map(String::as_str).unwrap_or_default();
    // a bare "0" counts as no tag
    if GET_RULES.check_keys(&query).is_err() || literal == NO_TAG {
        return Ok(CheckinResponse::lookup_error(ResponseMessages::MISSING_TAG));
    }

    let db = state.database.db();
    let users = SqliteUserRepository::new(db.clone());
    let owner = users.find_user_id_by_tag(literal.trim()).await?;
    let name = if owner.is_unknown() {
        None
    } else {
        users.find_user_name(owner).await?
    };
    let Some(name) = name else {
        debug!(tag = literal, "summary for unknown tag");
        return Ok(CheckinResponse::lookup_error(
            ResponseMessages::tag_not_found(literal),
        ));
    };

    let settings = &state.settings;
    let scans = SqliteScanEventRepository::new(db);
    let window = scans
        .find_for_ranking(settings.ranking_start, settings.time_column)
        .await?;
    let own = scans.find_by_user(owner).await?;

    let today = day_key(&state.clock.now());
    let daily = daily_meters(&own, settings.meters_per_lap)
        .get(&today)
        .map_or(0, |day| day.meters);
    let rank = rank_of(&window, owner, settings.meters_per_lap).map_or(0, |entry| entry.rank);

    Ok(CheckinResponse::summary(name, daily, rank))
}

/// Any other method inside opening hours
pub async fn connected() -> CheckinResponse {
    CheckinResponse::connected()
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: String,
}

/// Liveness plus database reachability
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let db = state.database.db();
    let version = if db.is_successful() {
        db.db_version().await.ok()
    } else {
        None
    };

    Json(match version {
        Some(database) => HealthReport {
            status: "ok",
            database,
        },
        None => HealthReport {
            status: "degraded",
            database: "unavailable".to_string(),
        },
    })
}
