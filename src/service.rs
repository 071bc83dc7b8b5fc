use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::attempt::{Attempt, AttemptId, NewAttempt};
use crate::error::{PracticeError, Result};
use crate::geometry::Point;
use crate::progress::{CharacterId, UserId, UserProgress};
use crate::reducer::PathReducer;
use crate::store::{StrokeStore, UserSnapshot};

/// Shortest path a submission may carry
pub const MIN_PATH_POINTS: usize = 2;

/// A stroke attempt as received from a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeSubmission {
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub stroke_index: i64,
    pub path: Vec<Point>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub record_id: AttemptId,
    pub simplified_nodes: Vec<Point>,
}

/// Reject submissions the store must never see
pub fn validate(submission: &StrokeSubmission) -> Result<()> {
    if submission.user_id <= 0 {
        return Err(PracticeError::invalid(format!(
            "userId must be positive, got {}",
            submission.user_id
        )));
    }
    if submission.character_id <= 0 {
        return Err(PracticeError::invalid(format!(
            "characterId must be positive, got {}",
            submission.character_id
        )));
    }
    if submission.stroke_index < 0 {
        return Err(PracticeError::invalid(format!(
            "strokeIndex must not be negative, got {}",
            submission.stroke_index
        )));
    }
    if submission.path.len() < MIN_PATH_POINTS {
        return Err(PracticeError::invalid(format!(
            "path needs at least {} points, got {}",
            MIN_PATH_POINTS,
            submission.path.len()
        )));
    }
    if !submission.score.is_finite() {
        return Err(PracticeError::invalid("score must be a finite number"));
    }
    if let Some(i) = submission.path.iter().position(|p| !p.is_finite()) {
        return Err(PracticeError::invalid(format!(
            "path point {} has a non-finite coordinate",
            i
        )));
    }
    Ok(())
}

/// Submission pipeline: validate, reduce, then record through the store
#[derive(Clone)]
pub struct PracticeService {
    reducer: PathReducer,
    store: Arc<dyn StrokeStore>,
}

impl PracticeService {
    pub fn new(reducer: PathReducer, store: Arc<dyn StrokeStore>) -> Self {
        Self { reducer, store }
    }

    pub fn submit(&self, submission: StrokeSubmission) -> Result<SubmissionReceipt> {
        if let Err(e) = validate(&submission) {
            warn!(
                user_id = submission.user_id,
                character_id = submission.character_id,
                error = %e,
                "rejected stroke submission"
            );
            return Err(e);
        }

        let simplified_nodes = self.reducer.reduce(&submission.path);
        let attempt = self.store.record_attempt(NewAttempt {
            user_id: submission.user_id,
            character_id: submission.character_id,
            stroke_index: submission.stroke_index,
            path: submission.path,
            score: submission.score,
        })?;
        debug!(
            record_id = attempt.id,
            points = simplified_nodes.len(),
            "stroke accepted"
        );

        Ok(SubmissionReceipt {
            record_id: attempt.id,
            simplified_nodes,
        })
    }

    pub fn progress(&self, user_id: UserId) -> Result<UserProgress> {
        self.store.user_progress(user_id)
    }

    pub fn history(&self, user_id: UserId) -> Result<Vec<Attempt>> {
        self.store.attempts_by_user(user_id)
    }

    pub fn snapshot(&self, user_id: UserId) -> Result<UserSnapshot> {
        self.store.user_snapshot(user_id)
    }
}
