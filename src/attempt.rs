use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::progress::{CharacterId, UserId};

pub type AttemptId = i64;

/// A submission that has passed validation but has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttempt {
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub stroke_index: i64,
    pub path: Vec<Point>,
    pub score: f64,
}

/// One accepted stroke submission, immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub stroke_index: i64,
    pub path: Vec<Point>,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    pub fn from_new(id: AttemptId, new: NewAttempt, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            character_id: new.character_id,
            stroke_index: new.stroke_index,
            path: new.path,
            score: new.score,
            created_at,
        }
    }
}

/// Append-only attempt log with monotonically assigned ids
#[derive(Debug, Clone)]
pub struct AttemptLog {
    attempts: Vec<Attempt>,
    next_id: AttemptId,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
            next_id: 1,
        }
    }

    pub fn append(&mut self, new: NewAttempt, now: DateTime<Utc>) -> &Attempt {
        let id = self.next_id;
        self.next_id += 1;
        self.attempts.push(Attempt::from_new(id, new, now));
        &self.attempts[self.attempts.len() - 1]
    }

    /// Attempts by one user, oldest first
    pub fn by_user(&self, user_id: UserId) -> Vec<Attempt> {
        self.attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

impl Default for AttemptLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::path_from;

    fn new_attempt(user_id: UserId, character_id: CharacterId) -> NewAttempt {
        NewAttempt {
            user_id,
            character_id,
            stroke_index: 0,
            path: path_from([(0., 0.), (10., 0.)]),
            score: 0.5,
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut log = AttemptLog::new();
        let now = Utc::now();
        let ids: Vec<AttemptId> = (0..4)
            .map(|_| log.append(new_attempt(1, 1), now).id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn by_user_keeps_submission_order() {
        let mut log = AttemptLog::new();
        let now = Utc::now();
        log.append(new_attempt(1, 10), now);
        log.append(new_attempt(2, 20), now);
        log.append(new_attempt(1, 30), now);

        let mine = log.by_user(1);
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].character_id, 10);
        assert_eq!(mine[1].character_id, 30);
        assert!(mine[0].id < mine[1].id);
    }

    #[test]
    fn unknown_user_has_empty_history() {
        let log = AttemptLog::new();
        assert!(log.is_empty());
        assert!(log.by_user(5).is_empty());
    }

    #[test]
    fn attempt_serializes_camel_case() {
        let mut log = AttemptLog::new();
        let attempt = log.append(new_attempt(3, 4), Utc::now()).clone();
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["userId"], 3);
        assert_eq!(json["characterId"], 4);
        assert_eq!(json["strokeIndex"], 0);
        assert_eq!(json["path"][1]["x"], 10.0);
        assert!(json["createdAt"].is_string());
    }
}
