use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TutorError;

/// How hard the student found a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(TutorError::InvalidRequest(format!(
                "unknown difficulty '{}', expected easy, medium or hard",
                other
            ))),
        }
    }
}

/// A concept scheduled for spaced review. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub id: Uuid,
    pub assistant_id: Uuid,
    pub session_id: String,
    pub topic: String,
    pub last_reviewed: DateTime<Utc>,
    pub next_review: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub streak: u32,
}

impl ReviewItem {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!(matches!(
            "trivial".parse::<Difficulty>(),
            Err(TutorError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_review_item_serializes_camel_case() {
        let now = Utc::now();
        let item = ReviewItem {
            id: Uuid::new_v4(),
            assistant_id: Uuid::new_v4(),
            session_id: "s-1".to_string(),
            topic: "Célula".to_string(),
            last_reviewed: now,
            next_review: now,
            difficulty: Difficulty::Medium,
            streak: 2,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["difficulty"], "medium");
        assert_eq!(json["streak"], 2);
        assert!(json["nextReview"].is_string());
        assert!(item.is_due(now));
    }
}
