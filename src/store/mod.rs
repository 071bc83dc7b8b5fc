//! Storage capability for attempts and progress.
//!
//! A store owns both the attempt log and the progress table. Recording an
//! attempt appends it and folds its score into the user's progress as one
//! unit, so no reader can see one without the other.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::Serialize;

use crate::attempt::{Attempt, NewAttempt};
use crate::error::Result;
use crate::progress::{UserId, UserProgress};

/// A user's progress and attempt history read as one consistent view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserSnapshot {
    pub progress: UserProgress,
    pub attempts: Vec<Attempt>,
}

impl UserSnapshot {
    /// Attempts counted by the progress table, summed over characters
    pub fn counted_attempts(&self) -> u64 {
        self.progress.iter().map(|p| p.attempts).sum()
    }
}

pub trait StrokeStore: Send + Sync {
    /// Append the attempt and update progress atomically
    fn record_attempt(&self, attempt: NewAttempt) -> Result<Attempt>;

    /// Attempts by a user in submission order, empty when there are none
    fn attempts_by_user(&self, user_id: UserId) -> Result<Vec<Attempt>>;

    /// Progress for a user, empty when the user has never submitted
    fn user_progress(&self, user_id: UserId) -> Result<UserProgress>;

    /// Progress and history together, with no submission applied in between
    fn user_snapshot(&self, user_id: UserId) -> Result<UserSnapshot>;
}
