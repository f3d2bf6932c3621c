//! Card store
//!
//! Holds every card in insertion order behind a single mutex. Each public
//! operation takes the lock once, so a review reads, schedules and writes
//! back a card without interleaving with other operations.
//!
//! A store opened with [`CardStore::open`] mirrors its cards to a JSON file
//! after every mutation. A mutation whose snapshot write fails is rolled
//! back in memory before the error is returned.
//! ```text
//! {data-dir}/
//! └── cards.json    # Array of all cards
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::algorithm::{record_review, select_due, INITIAL_INTERVAL_DAYS, MAX_INTERVAL_DAYS};
use super::models::*;

#[derive(Error, Debug)]
pub enum CardStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CardStoreError>;

/// Identity-keyed holder of card records
pub struct CardStore {
    cards: Mutex<Vec<Card>>,
    /// Snapshot file, if this store is persisted
    snapshot_path: Option<PathBuf>,
}

impl CardStore {
    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            cards: Mutex::new(Vec::new()),
            snapshot_path: None,
        }
    }

    /// Open a store backed by a JSON snapshot, loading existing cards
    pub fn open(snapshot_path: PathBuf) -> Result<Self> {
        let cards = if snapshot_path.exists() {
            load_snapshot(&snapshot_path)?
        } else {
            if let Some(parent) = snapshot_path.parent() {
                fs::create_dir_all(parent)?;
            }
            Vec::new()
        };

        log::info!(
            "Card store opened at {:?} with {} cards",
            snapshot_path,
            cards.len()
        );

        Ok(Self {
            cards: Mutex::new(cards),
            snapshot_path: Some(snapshot_path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Card>> {
        // Every operation leaves the list consistent, so a poisoned lock is safe to reuse
        self.cards.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, cards: &[Card]) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            // Atomic write: write to .tmp then rename
            let tmp_path = path.with_extension("json.tmp");
            fs::write(&tmp_path, serde_json::to_string_pretty(cards)?)?;
            fs::rename(&tmp_path, path)?;
        }
        Ok(())
    }

    // ==================== Card Operations ====================

    /// Create a new card, due now
    pub fn create(&self, front: String, back: String) -> Result<Card> {
        self.create_at(front, back, Utc::now())
    }

    /// Create a new card with an explicit creation time
    pub fn create_at(&self, front: String, back: String, now: DateTime<Utc>) -> Result<Card> {
        let card = Card::new(front, back, now);

        let mut cards = self.lock();
        cards.push(card.clone());
        if let Err(e) = self.persist(&cards) {
            cards.pop();
            return Err(e);
        }

        log::debug!("Created card {}", card.id);
        Ok(card)
    }

    /// Get a specific card
    pub fn get(&self, id: Uuid) -> Result<Card> {
        self.lock()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(CardStoreError::CardNotFound(id))
    }

    /// List all cards in insertion order
    pub fn list_all(&self) -> Vec<Card> {
        self.lock().clone()
    }

    /// Delete a card permanently
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let mut cards = self.lock();
        let pos = cards
            .iter()
            .position(|c| c.id == id)
            .ok_or(CardStoreError::CardNotFound(id))?;

        let removed = cards.remove(pos);
        if let Err(e) = self.persist(&cards) {
            cards.insert(pos, removed);
            return Err(e);
        }

        log::debug!("Deleted card {}", id);
        Ok(())
    }

    // ==================== Review Operations ====================

    /// Record a review outcome and write the new schedule back onto the card
    pub fn review(
        &self,
        id: Uuid,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Result<(ReviewUpdate, Card)> {
        let mut cards = self.lock();
        let pos = cards
            .iter()
            .position(|c| c.id == id)
            .ok_or(CardStoreError::CardNotFound(id))?;

        let previous = cards[pos].clone();
        let update = record_review(&previous, outcome, now);
        update.apply_to(&mut cards[pos]);

        if let Err(e) = self.persist(&cards) {
            cards[pos] = previous;
            return Err(e);
        }
        let card = cards[pos].clone();

        log::debug!(
            "Reviewed card {} ({:?}): interval {} days, due {}",
            id,
            outcome,
            update.interval_days,
            update.next_due_at
        );
        Ok((update, card))
    }

    /// All cards due at `now`, in insertion order
    pub fn due(&self, now: DateTime<Utc>) -> Vec<Card> {
        select_due(self.lock().iter(), now)
    }

    /// Review statistics across the whole store
    pub fn stats(&self, now: DateTime<Utc>) -> StoreStats {
        let cards = self.lock();

        let mut stats = StoreStats {
            total_cards: cards.len(),
            ..Default::default()
        };

        for card in cards.iter() {
            if card.is_due(now) {
                stats.due_cards += 1;
            }
            stats.correct_reviews += u64::from(card.correct_count);
            stats.incorrect_reviews += u64::from(card.incorrect_count);
        }

        stats
    }
}

/// Read and validate a snapshot file
pub fn load_snapshot(path: &Path) -> Result<Vec<Card>> {
    let content = fs::read_to_string(path)?;
    let cards: Vec<Card> = serde_json::from_str(&content)?;

    let mut seen = HashSet::with_capacity(cards.len());
    for card in &cards {
        if !(INITIAL_INTERVAL_DAYS..=MAX_INTERVAL_DAYS).contains(&card.interval_days) {
            return Err(CardStoreError::InvalidInput(format!(
                "card {} has interval_days {}",
                card.id, card.interval_days
            )));
        }
        if !seen.insert(card.id) {
            return Err(CardStoreError::InvalidInput(format!(
                "duplicate card id {}",
                card.id
            )));
        }
    }

    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn create_test_store() -> (CardStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = CardStore::open(temp_dir.path().join("cards.json")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_create_and_get_card() {
        let store = CardStore::in_memory();

        let created = store
            .create_at("hola".to_string(), "hello".to_string(), t0())
            .unwrap();
        assert_eq!(created.interval_days, 1);
        assert_eq!(created.next_due_at, t0());

        let retrieved = store.get(created.id).unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = CardStore::in_memory();
        let a = store.create("a".to_string(), "1".to_string()).unwrap();
        let b = store.create("a".to_string(), "1".to_string()).unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_get_missing_card() {
        let store = CardStore::in_memory();
        let id = Uuid::new_v4();

        assert!(matches!(store.get(id), Err(CardStoreError::CardNotFound(missing)) if missing == id));
    }

    #[test]
    fn test_list_all_keeps_insertion_order() {
        let store = CardStore::in_memory();
        let ids: Vec<Uuid> = (0..4)
            .map(|i| store.create(format!("front {}", i), format!("back {}", i)).unwrap().id)
            .collect();

        let listed: Vec<Uuid> = store.list_all().iter().map(|c| c.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_delete_card_twice() {
        let store = CardStore::in_memory();
        let card = store.create("x".to_string(), "y".to_string()).unwrap();

        store.delete(card.id).unwrap();
        assert!(matches!(store.get(card.id), Err(CardStoreError::CardNotFound(_))));
        assert!(matches!(store.delete(card.id), Err(CardStoreError::CardNotFound(_))));
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn test_review_writes_back() {
        let store = CardStore::in_memory();
        let card = store
            .create_at("hola".to_string(), "hello".to_string(), t0())
            .unwrap();

        let (update, reviewed) = store.review(card.id, Outcome::Correct, t0()).unwrap();
        assert_eq!(update.interval_days, 2);
        assert_eq!(reviewed.next_due_at, t0() + Duration::days(2));

        let stored = store.get(card.id).unwrap();
        assert_eq!(stored, reviewed);
        assert_eq!(stored.front, "hola");
        assert_eq!(stored.back, "hello");
    }

    #[test]
    fn test_review_missing_card_changes_nothing() {
        let store = CardStore::in_memory();
        let card = store.create_at("a".to_string(), "b".to_string(), t0()).unwrap();

        let result = store.review(Uuid::new_v4(), Outcome::Correct, t0());
        assert!(matches!(result, Err(CardStoreError::CardNotFound(_))));
        assert_eq!(store.get(card.id).unwrap(), card);
    }

    #[test]
    fn test_due_cards() {
        let store = CardStore::in_memory();
        let first = store.create_at("hola".to_string(), "hello".to_string(), t0()).unwrap();
        let second = store.create_at("adios".to_string(), "bye".to_string(), t0()).unwrap();

        // first ends up due at T0+6d, second at T0+7d
        store.review(first.id, Outcome::Correct, t0()).unwrap();
        store.review(first.id, Outcome::Correct, t0() + Duration::days(2)).unwrap();
        store.review(second.id, Outcome::Correct, t0()).unwrap();
        store.review(second.id, Outcome::Correct, t0() + Duration::days(3)).unwrap();

        let due = store.due(t0() + Duration::days(6));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, first.id);

        assert!(store.due(t0() + Duration::days(1)).is_empty());
        assert_eq!(store.due(t0() + Duration::days(7)).len(), 2);
    }

    #[test]
    fn test_stats() {
        let store = CardStore::in_memory();
        let a = store.create_at("a".to_string(), "1".to_string(), t0()).unwrap();
        store.create_at("b".to_string(), "2".to_string(), t0()).unwrap();

        store.review(a.id, Outcome::Correct, t0()).unwrap();
        store.review(a.id, Outcome::Incorrect, t0()).unwrap();
        store.review(a.id, Outcome::Correct, t0()).unwrap();

        let stats = store.stats(t0());
        assert_eq!(stats.total_cards, 2);
        assert_eq!(stats.due_cards, 1);
        assert_eq!(stats.correct_reviews, 2);
        assert_eq!(stats.incorrect_reviews, 1);
    }

    #[test]
    fn test_concurrent_reviews_do_not_lose_updates() {
        let store = Arc::new(CardStore::in_memory());
        let id = store.create_at("a".to_string(), "b".to_string(), t0()).unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let outcome = Outcome::from_correct(i % 2 == 0);
                        store.review(id, outcome, t0()).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stored = store.get(id).unwrap();
        assert_eq!(stored.correct_count, 100);
        assert_eq!(stored.incorrect_count, 100);
        assert!(stored.interval_days >= 1 && stored.interval_days <= 30);
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let (store, temp) = create_test_store();
        let card = store.create_at("hola".to_string(), "hello".to_string(), t0()).unwrap();
        let deleted = store.create_at("gone".to_string(), "soon".to_string(), t0()).unwrap();
        store.review(card.id, Outcome::Correct, t0()).unwrap();
        store.delete(deleted.id).unwrap();
        drop(store);

        let reopened = CardStore::open(temp.path().join("cards.json")).unwrap();
        let cards = reopened.list_all();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, card.id);
        assert_eq!(cards[0].interval_days, 2);
        assert_eq!(cards[0].next_due_at, t0() + Duration::days(2));
    }

    #[test]
    fn test_snapshot_rejects_zero_interval() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cards.json");

        let mut card = Card::new("a".to_string(), "b".to_string(), t0());
        card.interval_days = 0;
        fs::write(&path, serde_json::to_string(&vec![card]).unwrap()).unwrap();

        assert!(matches!(CardStore::open(path), Err(CardStoreError::InvalidInput(_))));
    }

    #[test]
    fn test_snapshot_rejects_interval_above_cap() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cards.json");

        let mut card = Card::new("a".to_string(), "b".to_string(), t0());
        card.interval_days = 32;
        fs::write(&path, serde_json::to_string(&vec![card]).unwrap()).unwrap();

        assert!(matches!(CardStore::open(path), Err(CardStoreError::InvalidInput(_))));
    }

    #[test]
    fn test_snapshot_rejects_duplicate_ids() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cards.json");

        let card = Card::new("a".to_string(), "b".to_string(), t0());
        let mut copy = card.clone();
        copy.front = "other".to_string();
        fs::write(&path, serde_json::to_string(&vec![card, copy]).unwrap()).unwrap();

        assert!(matches!(CardStore::open(path), Err(CardStoreError::InvalidInput(_))));
    }

    #[test]
    fn test_snapshot_write_leaves_no_temp_file() {
        let (store, temp) = create_test_store();
        store.create("a".to_string(), "b".to_string()).unwrap();

        assert!(temp.path().join("cards.json").exists());
        assert!(!temp.path().join("cards.json.tmp").exists());
        assert_eq!(load_snapshot(&temp.path().join("cards.json")).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_snapshot_write_rolls_back() {
        let (store, temp) = create_test_store();
        let card = store.create_at("hola".to_string(), "hello".to_string(), t0()).unwrap();

        // A directory in place of the snapshot makes every rename fail
        let path = temp.path().join("cards.json");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let review = store.review(card.id, Outcome::Correct, t0());
        assert!(matches!(review, Err(CardStoreError::Io(_))));
        assert_eq!(store.get(card.id).unwrap(), card);

        let created = store.create_at("adios".to_string(), "bye".to_string(), t0());
        assert!(created.is_err());
        assert_eq!(store.list_all(), vec![card.clone()]);

        assert!(store.delete(card.id).is_err());
        assert_eq!(store.get(card.id).unwrap(), card);
        assert_eq!(store.list_all(), vec![card]);
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("cards.json");

        let store = CardStore::open(path.clone()).unwrap();
        store.create("a".to_string(), "b".to_string()).unwrap();

        assert!(path.exists());
        assert_eq!(store.snapshot_path(), Some(path.as_path()));
    }
}
