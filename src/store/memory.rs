use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{StrokeStore, UserSnapshot};
use crate::attempt::{Attempt, AttemptLog, NewAttempt};
use crate::error::Result;
use crate::progress::{MasteryScale, ProgressBook, UserId, UserProgress};

#[derive(Debug, Default)]
struct Ledger {
    log: AttemptLog,
    book: ProgressBook,
}

/// Volatile store; all state is lost when the process exits.
///
/// One lock guards the log and the progress table together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new(scale: MasteryScale) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                log: AttemptLog::new(),
                book: ProgressBook::new(scale),
            }),
        }
    }

    // Every critical section leaves the ledger consistent, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StrokeStore for MemoryStore {
    fn record_attempt(&self, attempt: NewAttempt) -> Result<Attempt> {
        let mut ledger = self.lock();
        let (user_id, character_id, stroke_index, score) = (
            attempt.user_id,
            attempt.character_id,
            attempt.stroke_index,
            attempt.score,
        );

        let stored = ledger.log.append(attempt, Utc::now()).clone();
        let progress = ledger.book.record(user_id, character_id, stroke_index, score);
        debug!(
            id = stored.id,
            user_id,
            character_id,
            attempts = progress.attempts,
            "recorded attempt"
        );

        Ok(stored)
    }

    fn attempts_by_user(&self, user_id: UserId) -> Result<Vec<Attempt>> {
        Ok(self.lock().log.by_user(user_id))
    }

    fn user_progress(&self, user_id: UserId) -> Result<UserProgress> {
        Ok(self.lock().book.user(user_id))
    }

    fn user_snapshot(&self, user_id: UserId) -> Result<UserSnapshot> {
        let ledger = self.lock();
        Ok(UserSnapshot {
            progress: ledger.book.user(user_id),
            attempts: ledger.log.by_user(user_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::path_from;

    fn attempt(user_id: UserId, stroke_index: i64, score: f64) -> NewAttempt {
        NewAttempt {
            user_id,
            character_id: 1,
            stroke_index,
            path: path_from([(0., 0.), (5., 5.)]),
            score,
        }
    }

    #[test]
    fn record_updates_log_and_progress() {
        let store = MemoryStore::default();
        let stored = store.record_attempt(attempt(1, 0, 0.4)).unwrap();
        assert_eq!(stored.id, 1);

        let history = store.attempts_by_user(1).unwrap();
        assert_eq!(history, vec![stored]);

        let progress = store.user_progress(1).unwrap();
        assert_eq!(progress.get(1).unwrap().attempts, 1);
    }

    #[test]
    fn created_at_is_stamped_by_the_store() {
        let before = Utc::now();
        let store = MemoryStore::default();
        let stored = store.record_attempt(attempt(1, 0, 0.4)).unwrap();
        assert!(stored.created_at >= before);
        assert!(stored.created_at <= Utc::now());
    }

    #[test]
    fn reads_for_unknown_user_are_empty() {
        let store = MemoryStore::default();
        assert!(store.attempts_by_user(9).unwrap().is_empty());
        assert!(store.user_progress(9).unwrap().is_empty());
    }

    #[test]
    fn snapshot_pairs_history_with_progress() {
        let store = MemoryStore::default();
        store.record_attempt(attempt(2, 0, 0.2)).unwrap();
        store.record_attempt(attempt(2, 1, 0.6)).unwrap();
        store.record_attempt(attempt(3, 0, 1.0)).unwrap();

        let snapshot = store.user_snapshot(2).unwrap();
        assert_eq!(snapshot.attempts.len(), 2);
        assert_eq!(snapshot.counted_attempts(), 2);
        assert_eq!(snapshot.progress, store.user_progress(2).unwrap());
        assert_eq!(store.user_snapshot(9).unwrap(), UserSnapshot::default());
    }

    #[test]
    fn store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryStore>();
    }
}
