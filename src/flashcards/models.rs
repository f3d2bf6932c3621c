//! Data models for the flashcard system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::algorithm::INITIAL_INTERVAL_DAYS;

/// A flashcard with question (front) and answer (back) plus its review schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    /// Current spacing between reviews, in days (always >= 1)
    pub interval_days: u32,
    /// The card becomes due at or after this instant
    pub next_due_at: DateTime<Utc>,
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default)]
    pub incorrect_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// A fresh card, due immediately
    pub fn new(front: String, back: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            front,
            back,
            interval_days: INITIAL_INTERVAL_DAYS,
            next_due_at: now,
            correct_count: 0,
            incorrect_count: 0,
            created_at: now,
        }
    }

    /// Check if the card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due_at <= now
    }
}

/// Result of a single review attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
}

impl Outcome {
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Self::Correct
        } else {
            Self::Incorrect
        }
    }
}

/// Scheduling fields produced by a review, to be written back onto the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUpdate {
    pub interval_days: u32,
    pub next_due_at: DateTime<Utc>,
    pub correct_count: u32,
    pub incorrect_count: u32,
}

impl ReviewUpdate {
    pub fn apply_to(&self, card: &mut Card) {
        card.interval_days = self.interval_days;
        card.next_due_at = self.next_due_at;
        card.correct_count = self.correct_count;
        card.incorrect_count = self.incorrect_count;
    }
}

/// Aggregate counts over the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_cards: usize,
    pub due_cards: usize,
    pub correct_reviews: u64,
    pub incorrect_reviews: u64,
}
