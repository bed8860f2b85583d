//! Points ledger: the authoritative balance and lifetime-earnings
//! tracker. Operates on a [`UserRecord`] in place; callers commit the
//! record through [`GameStore::update_user`](crate::engine::storage::GameStore::update_user)
//! so a multi-field change lands as a single write.

use chrono::NaiveDate;

use crate::engine::errors::EngineError;
use crate::engine::types::{week_start_of, UserRecord};

/// Credit `amount` points to the user. Raises spendable, lifetime and
/// weekly totals together; lifetime and weekly totals are earn-only and
/// never reduced by debits.
pub fn credit(user: &mut UserRecord, amount: i64, today: NaiveDate) -> Result<(), EngineError> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    roll_week(user, today);
    user.points += amount;
    user.lifetime_points += amount;
    user.weekly_points += amount;
    Ok(())
}

/// Debit `amount` points. Rejected outright (not clamped) if it would
/// drive the balance negative.
pub fn debit(user: &mut UserRecord, amount: i64, today: NaiveDate) -> Result<(), EngineError> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    roll_week(user, today);
    if user.points < amount {
        return Err(EngineError::InsufficientBalance {
            have: user.points,
            need: amount,
        });
    }
    user.points -= amount;
    Ok(())
}

/// Advance the weekly-points window if `today` has crossed the week
/// boundary since `week_start`. Idempotent within a week; applied lazily
/// at the start of the first operation observed after the boundary.
pub fn roll_week(user: &mut UserRecord, today: NaiveDate) {
    let current_week = week_start_of(today);
    if current_week > user.week_start {
        user.weekly_points = 0;
        user.week_start = current_week;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn user() -> UserRecord {
        UserRecord::new("u1", "alice", d(2026, 8, 26))
    }

    #[test]
    fn credit_raises_all_three_totals() {
        let mut u = user();
        credit(&mut u, 50, d(2026, 8, 26)).unwrap();
        assert_eq!(u.points, 50);
        assert_eq!(u.lifetime_points, 50);
        assert_eq!(u.weekly_points, 50);
    }

    #[test]
    fn credit_rejects_non_positive_amounts() {
        let mut u = user();
        assert!(matches!(
            credit(&mut u, 0, d(2026, 8, 26)),
            Err(EngineError::InvalidAmount(0))
        ));
        assert!(matches!(
            credit(&mut u, -5, d(2026, 8, 26)),
            Err(EngineError::InvalidAmount(-5))
        ));
        assert_eq!(u.points, 0);
    }

    #[test]
    fn debit_never_goes_negative() {
        let mut u = user();
        credit(&mut u, 30, d(2026, 8, 26)).unwrap();
        assert!(matches!(
            debit(&mut u, 31, d(2026, 8, 26)),
            Err(EngineError::InsufficientBalance { have: 30, need: 31 })
        ));
        assert_eq!(u.points, 30);

        // Debit of exactly the balance succeeds and leaves zero.
        debit(&mut u, 30, d(2026, 8, 26)).unwrap();
        assert_eq!(u.points, 0);
    }

    #[test]
    fn debit_leaves_lifetime_and_weekly_untouched() {
        let mut u = user();
        credit(&mut u, 100, d(2026, 8, 26)).unwrap();
        debit(&mut u, 40, d(2026, 8, 26)).unwrap();
        assert_eq!(u.points, 60);
        assert_eq!(u.lifetime_points, 100);
        assert_eq!(u.weekly_points, 100);
    }

    #[test]
    fn week_rollover_zeroes_weekly_only() {
        let mut u = user();
        credit(&mut u, 100, d(2026, 8, 26)).unwrap(); // Wednesday
        assert_eq!(u.week_start, d(2026, 8, 24));

        // Next Monday: weekly window rolls, spendable balance survives.
        credit(&mut u, 10, d(2026, 8, 31)).unwrap();
        assert_eq!(u.week_start, d(2026, 8, 31));
        assert_eq!(u.weekly_points, 10);
        assert_eq!(u.points, 110);
        assert_eq!(u.lifetime_points, 110);
    }

    #[test]
    fn roll_week_is_idempotent_within_a_week() {
        let mut u = user();
        credit(&mut u, 25, d(2026, 8, 31)).unwrap();
        roll_week(&mut u, d(2026, 9, 2));
        roll_week(&mut u, d(2026, 9, 4));
        assert_eq!(u.weekly_points, 25);
        assert_eq!(u.week_start, d(2026, 8, 31));
    }
}
