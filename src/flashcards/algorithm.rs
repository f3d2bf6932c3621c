//! Doubling/reset spaced repetition
//!
//! Each correct answer doubles the review interval, capped at one month.
//! An incorrect answer sends the card back to a one day interval.
//!
//! Reachable intervals: 1, 2, 4, 8, 16, 30 days.

use chrono::{DateTime, Duration, Utc};

use super::models::{Card, Outcome, ReviewUpdate};

/// Interval given to new and forgotten cards
pub const INITIAL_INTERVAL_DAYS: u32 = 1;

/// Upper bound on the interval
pub const MAX_INTERVAL_DAYS: u32 = 30;

/// Calculate the scheduling fields after reviewing `card` at `now`
///
/// The card itself is left untouched; use [`ReviewUpdate::apply_to`] to
/// persist the result.
pub fn record_review(card: &Card, outcome: Outcome, now: DateTime<Utc>) -> ReviewUpdate {
    debug_assert!(card.interval_days >= INITIAL_INTERVAL_DAYS);

    let mut correct_count = card.correct_count;
    let mut incorrect_count = card.incorrect_count;

    let interval_days = match outcome {
        Outcome::Correct => {
            correct_count = correct_count.saturating_add(1);
            card.interval_days.saturating_mul(2).min(MAX_INTERVAL_DAYS)
        }
        Outcome::Incorrect => {
            incorrect_count = incorrect_count.saturating_add(1);
            INITIAL_INTERVAL_DAYS
        }
    };

    ReviewUpdate {
        interval_days,
        next_due_at: now + Duration::days(i64::from(interval_days)),
        correct_count,
        incorrect_count,
    }
}

/// Filter `cards` down to those due at `now`, keeping input order
pub fn select_due<'a, I>(cards: I, now: DateTime<Utc>) -> Vec<Card>
where
    I: IntoIterator<Item = &'a Card>,
{
    cards
        .into_iter()
        .filter(|card| card.is_due(now))
        .cloned()
        .collect()
}

/// Format an interval in days for display
pub fn describe_interval(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}
