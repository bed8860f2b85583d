//! Streak evaluation and tier derivation.
//!
//! Runs exactly once per user per day, when the last pending daily quest
//! for that date completes. Tier is a pure function of streak length and
//! is never stored or mutated independently.

use chrono::{Duration, NaiveDate};

use crate::engine::types::{Tier, TierInfo, UserRecord};

/// Apply one day's streak evaluation for a completion on `today`.
/// Returns true when the streak counter moved (the caller surfaces this
/// as the `streak_incremented` flag).
///
/// Rules:
/// - already evaluated today: no-op;
/// - completed yesterday: streak continues;
/// - gap of one or more days: a held streak freeze is consumed to bridge
///   it as a continuation, otherwise the streak restarts at 1.
pub fn evaluate(user: &mut UserRecord, today: NaiveDate) -> bool {
    let changed = match user.last_daily_completion {
        Some(last) if last == today => false,
        Some(last) if last == today - Duration::days(1) => {
            user.streak += 1;
            true
        }
        Some(_) if user.streak_freeze_available => {
            user.streak_freeze_available = false;
            user.streak += 1;
            true
        }
        Some(_) => {
            user.streak = 1;
            true
        }
        None => {
            user.streak = 1;
            true
        }
    };
    if changed {
        user.last_daily_completion = Some(today);
    }
    changed
}

/// Build the tier panel view: current bracket plus how many more
/// qualifying days reach the next one.
pub fn tier_info(user: &UserRecord) -> TierInfo {
    let tier = Tier::from_streak(user.streak);
    let next_tier = tier.next();
    let streaks_to_next_tier = next_tier.map(|next| next.min_streak() - user.streak);
    TierInfo {
        tier,
        discount_percentage: tier.discount_percent(),
        current_streak: user.streak,
        next_tier,
        streaks_to_next_tier,
    }
}
