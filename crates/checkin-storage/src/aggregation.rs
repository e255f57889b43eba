//! Daily meters and ranking over stored scans.
//!
//! A lap is an entry scan followed by an exit scan on the same day. Each
//! completed lap is worth a configured number of meters.

use crate::models::ScanEvent;
use checkin_core::{Direction, UserId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-day tally for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DailyMeters {
    /// `YYYYMMDD`
    pub day: u32,
    /// Entry scans
    pub up: u32,
    /// Exit scans
    pub down: u32,
    pub meters: i64,
}

/// One line of the ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub meters: i64,
}

/// Tally one user's scans per day
///
/// `events` must belong to a single user and be in chronological order.
/// Scans whose time or direction cannot be decoded are skipped.
pub fn daily_meters(events: &[ScanEvent], meters_per_lap: i64) -> BTreeMap<u32, DailyMeters> {
    tally(events.iter(), meters_per_lap)
}

fn tally<'a>(
    events: impl IntoIterator<Item = &'a ScanEvent>,
    meters_per_lap: i64,
) -> BTreeMap<u32, DailyMeters> {
    let mut days: BTreeMap<u32, (DailyMeters, bool)> = BTreeMap::new();

    for event in events {
        let (day, direction) = match (event.check_time.day_key(), event.direction()) {
            (Ok(day), Ok(direction)) => (day, direction),
            _ => {
                debug!(id = event.id, "skipping undecodable scan");
                continue;
            }
        };

        let (meters, inside) = days.entry(day).or_insert_with(|| {
            (
                DailyMeters {
                    day,
                    ..DailyMeters::default()
                },
                false,
            )
        });

        match direction {
            Direction::Entry => {
                meters.up += 1;
                *inside = true;
            }
            Direction::Exit => {
                meters.down += 1;
                if *inside {
                    meters.meters += meters_per_lap;
                    *inside = false;
                }
            }
        }
    }

    days.into_iter().map(|(day, (meters, _))| (day, meters)).collect()
}

/// Rank every user by total meters
///
/// Highest total first. Equal totals share a rank and the next rank skips
/// accordingly (1, 2, 2, 4); within a tie users are ordered by id. Scans
/// of the system user and of unowned tags are ignored.
pub fn ranking(events: &[ScanEvent], meters_per_lap: i64) -> Vec<RankEntry> {
    let mut per_user: BTreeMap<UserId, Vec<&ScanEvent>> = BTreeMap::new();
    for event in events {
        if event.user_id.is_system() || event.user_id.is_unknown() {
            continue;
        }
        per_user.entry(event.user_id).or_default().push(event);
    }

    let mut totals: Vec<(UserId, i64)> = per_user
        .into_iter()
        .map(|(user_id, events)| {
            let total = tally(events, meters_per_lap)
                .values()
                .map(|day| day.meters)
                .sum();
            (user_id, total)
        })
        .collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut entries = Vec::with_capacity(totals.len());
    let mut rank = 0;
    let mut previous = None;
    for (position, (user_id, meters)) in totals.into_iter().enumerate() {
        if previous != Some(meters) {
            rank = position as u32 + 1;
            previous = Some(meters);
        }
        entries.push(RankEntry {
            rank,
            user_id,
            meters,
        });
    }
    entries
}

/// Ranking line of one user, `None` if they have no scans in `events`
pub fn rank_of(events: &[ScanEvent], user_id: UserId, meters_per_lap: i64) -> Option<RankEntry> {
    ranking(events, meters_per_lap)
        .into_iter()
        .find(|entry| entry.user_id == user_id)
}
