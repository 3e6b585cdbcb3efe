//! Review subsystem: spaced-repetition items and turn feedback.
//!
//! - `seed_review_item` runs after every chat turn that tagged a topic
//! - `rate_review_item` applies the scheduler to a student's rating
//! - `due_review_items` lists what a session should revisit now
//! - `record_feedback` stores a +1/-1 score on an assistant turn

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tutor_core::models::{Difficulty, ReviewItem};
use tutor_core::scheduler::{interval_days, schedule_next_at};
use tutor_core::{TutorError, TutorStore};
use uuid::Uuid;

/// Upper bound for `due_review_items` regardless of what the caller asks for.
pub const MAX_DUE_LIMIT: u32 = 100;

/// Create a review item for `topic` unless the session already tracks it.
///
/// New items start at medium difficulty with streak 0, so the first review
/// lands one day after `now`. An existing item is returned untouched.
pub async fn seed_review_item(
    store: &dyn TutorStore,
    assistant_id: Uuid,
    session_id: &str,
    topic: &str,
    now: DateTime<Utc>,
) -> Result<ReviewItem> {
    let first_interval = interval_days(Difficulty::Medium, 0).floor() as i64;
    let candidate = ReviewItem {
        id: Uuid::new_v4(),
        assistant_id,
        session_id: session_id.to_string(),
        topic: topic.to_string(),
        last_reviewed: now,
        next_review: now + Duration::days(first_interval),
        difficulty: Difficulty::Medium,
        streak: 0,
    };

    let stored = store.insert_review_item_if_absent(&candidate).await?;
    if stored.id == candidate.id {
        tracing::info!(
            review_id = %stored.id,
            session_id = %session_id,
            topic = %topic,
            "Seeded review item"
        );
    } else {
        tracing::debug!(review_id = %stored.id, topic = %topic, "Review item already tracked");
    }

    Ok(stored)
}

/// Apply a rating. Unknown ids surface as `TutorError::NotFound`.
pub async fn rate_review_item(
    store: &dyn TutorStore,
    id: Uuid,
    difficulty: Difficulty,
    now: DateTime<Utc>,
) -> Result<ReviewItem> {
    let mut item = store
        .get_review_item(id)
        .await?
        .ok_or_else(|| TutorError::NotFound(format!("review item {}", id)))?;

    let scheduled = schedule_next_at(difficulty, item.streak, now);
    item.difficulty = difficulty;
    item.streak = scheduled.new_streak;
    item.last_reviewed = now;
    item.next_review = scheduled.next_review;

    store.update_review_item(&item).await?;

    tracing::info!(
        review_id = %id,
        difficulty = %difficulty,
        streak = item.streak,
        interval_days = scheduled.interval_days,
        "Review rated"
    );

    Ok(item)
}

pub async fn due_review_items(
    store: &dyn TutorStore,
    session_id: &str,
    now: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<ReviewItem>> {
    let limit = limit.clamp(1, MAX_DUE_LIMIT);
    Ok(store.due_review_items(session_id, now, limit).await?)
}

/// Store a +1/-1 score on a turn. Other scores are rejected with
/// `TutorError::InvalidRequest`; unknown turns with `TutorError::NotFound`.
pub async fn record_feedback(store: &dyn TutorStore, turn_id: Uuid, score: i16) -> Result<()> {
    if score != 1 && score != -1 {
        return Err(TutorError::InvalidRequest(format!("score must be 1 or -1, got {}", score)).into());
    }

    if !store.set_turn_feedback(turn_id, score).await? {
        return Err(TutorError::NotFound(format!("turn {}", turn_id)).into());
    }

    tracing::info!(turn_id = %turn_id, score, "Feedback recorded");
    Ok(())
}
