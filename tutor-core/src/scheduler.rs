//! Spaced-repetition interval curve.
//!
//! interval(d, s) = min(cap_d, base_d ^ s)
//!
//!   easy   → base 2.0, cap 30 days
//!   medium → base 1.8, cap 21 days
//!   hard   → base 1.5, cap 14 days
//!
//! `s` is the streak *before* the rating. The new streak is 0 after a hard
//! rating and `s + 1` otherwise. Fractional intervals are floored to whole
//! days when the next review date is set.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Difficulty;

/// Outcome of rating a review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReview {
    pub next_review: DateTime<Utc>,
    pub new_streak: u32,
    pub interval_days: f64,
}

fn curve(difficulty: Difficulty) -> (f64, f64) {
    match difficulty {
        Difficulty::Easy => (2.0, 30.0),
        Difficulty::Medium => (1.8, 21.0),
        Difficulty::Hard => (1.5, 14.0),
    }
}

/// Raw (unfloored) interval in days for a rating at the given streak.
pub fn interval_days(difficulty: Difficulty, streak: u32) -> f64 {
    let (base, cap) = curve(difficulty);
    // powi takes i32; any streak past the cap point saturates anyway
    let exponent = streak.min(i32::MAX as u32) as i32;
    base.powi(exponent).min(cap)
}

pub fn next_streak(difficulty: Difficulty, streak: u32) -> u32 {
    match difficulty {
        Difficulty::Hard => 0,
        Difficulty::Easy | Difficulty::Medium => streak.saturating_add(1),
    }
}

/// Schedule relative to an explicit `now` (pure, used by tests and the store layer).
pub fn schedule_next_at(difficulty: Difficulty, streak: u32, now: DateTime<Utc>) -> ScheduledReview {
    let interval = interval_days(difficulty, streak);
    ScheduledReview {
        next_review: now + Duration::days(interval.floor() as i64),
        new_streak: next_streak(difficulty, streak),
        interval_days: interval,
    }
}

pub fn schedule_next(difficulty: Difficulty, streak: u32) -> ScheduledReview {
    schedule_next_at(difficulty, streak, Utc::now())
}
