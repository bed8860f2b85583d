//! Leaderboard ranker: a pure, on-demand ordering over user records.
//!
//! Ranking is recomputed from current standings on every read; nothing is
//! persisted except the per-period baseline snapshot that feeds the
//! directional-change arrows.

use chrono::{DateTime, Datelike, Utc};
use log::debug;

use crate::engine::errors::EngineError;
use crate::engine::ledger;
use crate::engine::storage::GameStore;
use crate::engine::types::{
    LeaderboardEntry, LeaderboardScope, Metric, RankChange, RankSnapshot, UserRecord,
    SNAPSHOT_SCHEMA_VERSION,
};

fn score_of(user: &UserRecord, metric: Metric) -> i64 {
    match metric {
        Metric::Points => user.points,
        Metric::WeeklyPoints => user.weekly_points,
        Metric::Streak => user.streak as i64,
    }
}

/// Scoring period key for a snapshot. Weekly-points boards reset their
/// baseline daily (the UI tracks intra-week movement); points and streak
/// boards reset at the ISO week boundary.
fn period_key(metric: Metric, now: DateTime<Utc>) -> String {
    let today = now.date_naive();
    match metric {
        Metric::WeeklyPoints => today.format("%Y-%m-%d").to_string(),
        Metric::Points | Metric::Streak => {
            let iso = today.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
    }
}

/// Pure ranking: descending by the requested metric, ties broken by
/// ascending user identifier, rank 1-based. Input order is irrelevant;
/// output is deterministic.
pub fn rank(mut users: Vec<UserRecord>, metric: Metric) -> Vec<(UserRecord, i64, u32)> {
    users.sort_by(|a, b| {
        score_of(b, metric)
            .cmp(&score_of(a, metric))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    users
        .into_iter()
        .enumerate()
        .map(|(i, user)| {
            let score = score_of(&user, metric);
            (user, score, (i + 1) as u32)
        })
        .collect()
}

/// Compute standings for a scope and metric, attaching `previous_rank`
/// from the baseline captured at the start of the current scoring period.
/// The only side effect is refreshing that baseline when a new period is
/// first observed.
pub fn standings(
    store: &GameStore,
    scope: &LeaderboardScope,
    metric: Metric,
    now: DateTime<Utc>,
) -> Result<Vec<LeaderboardEntry>, EngineError> {
    let mut users = match scope {
        LeaderboardScope::Global => store.list_users()?,
        LeaderboardScope::Community(community_id) => {
            store.get_community(community_id)?;
            store
                .list_users()?
                .into_iter()
                .filter(|u| u.is_member_of(community_id))
                .collect()
        }
    };

    // Weekly rollover is lazy per-user; users idle since the boundary
    // still carry last week's total. Roll the in-memory copies so the
    // board never shows a stale weekly score (nothing is persisted).
    let today = now.date_naive();
    for user in &mut users {
        ledger::roll_week(user, today);
    }

    let ranked = rank(users, metric);
    let period = period_key(metric, now);
    let scope_key = scope.key();
    let metric_key = metric.label();

    let baseline = match store.get_snapshot(&scope_key, metric_key)? {
        Some(snapshot) if snapshot.period == period => snapshot,
        stale => {
            // First read of a new period: the current order becomes the
            // baseline every later read in the period compares against.
            if stale.is_some() {
                debug!("rank snapshot rolled for {}:{} -> {}", scope_key, metric_key, period);
            }
            let snapshot = RankSnapshot {
                period: period.clone(),
                ranks: ranked
                    .iter()
                    .map(|(user, _, r)| (user.user_id.clone(), *r))
                    .collect(),
                captured_at: now,
                schema_version: SNAPSHOT_SCHEMA_VERSION,
            };
            store.put_snapshot(&scope_key, metric_key, snapshot.clone())?;
            snapshot
        }
    };

    Ok(ranked
        .into_iter()
        .map(|(user, score, rank)| {
            let previous_rank = baseline.rank_of(&user.user_id);
            let change = match previous_rank {
                Some(prev) if rank < prev => RankChange::Up,
                Some(prev) if rank > prev => RankChange::Down,
                _ => RankChange::Same,
            };
            LeaderboardEntry {
                user_id: user.user_id,
                username: user.username,
                score,
                streak: user.streak,
                rank,
                previous_rank,
                change,
            }
        })
        .collect())
}
