//! Overdue fine policy
//!
//! Kept as a pure function of two timestamps so the engine computes a fine
//! exactly once per return and nothing here depends on storage or clocks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Fine charged per whole overdue day, in hundredths of a unit
const DAILY_RATE_CENTS: i64 = 50;

/// Compute the fine owed for a return
///
/// Overdue time is truncated to whole days, so a return less than 24 hours
/// past due carries no fine.
pub fn compute_fine(due_date: DateTime<Utc>, return_date: DateTime<Utc>) -> Decimal {
    if return_date <= due_date {
        return Decimal::ZERO;
    }

    let days_overdue = (return_date - due_date).num_days();
    Decimal::new(DAILY_RATE_CENTS, 2) * Decimal::from(days_overdue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn on_time_return_is_free() {
        assert_eq!(
            compute_fine(date(2024, 1, 1), date(2024, 1, 1)),
            Decimal::ZERO
        );
    }

    #[test]
    fn early_return_is_free() {
        assert_eq!(
            compute_fine(date(2024, 1, 10), date(2024, 1, 3)),
            Decimal::ZERO
        );
    }

    #[test]
    fn three_days_late_costs_one_fifty() {
        assert_eq!(
            compute_fine(date(2024, 1, 1), date(2024, 1, 4)),
            Decimal::new(150, 2)
        );
    }

    #[test]
    fn sub_day_overdue_truncates_to_zero() {
        let due = date(2024, 1, 1);
        let returned = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap();
        assert_eq!(compute_fine(due, returned), Decimal::ZERO);
    }

    #[test]
    fn one_full_day_late_costs_fifty() {
        let due = date(2024, 1, 1);
        let returned = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 1).unwrap();
        assert_eq!(compute_fine(due, returned), Decimal::new(50, 2));
    }

    #[test]
    fn long_overdue_accrues_linearly() {
        assert_eq!(
            compute_fine(date(2024, 1, 1), date(2024, 1, 31)),
            Decimal::new(1500, 2)
        );
    }
}
