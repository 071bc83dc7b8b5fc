use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type UserId = i64;
pub type CharacterId = i64;

/// Factor applied to the average score to get the 0-100 mastery display value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasteryScale(pub f64);

impl MasteryScale {
    pub fn apply(&self, avg_score: f64) -> f64 {
        avg_score * self.0
    }
}

impl Default for MasteryScale {
    fn default() -> Self {
        MasteryScale(100.0)
    }
}

/// Running statistics for one user on one character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProgress {
    pub character_id: CharacterId,
    pub attempts: u64,
    pub avg_score: f64,
    pub mastery: f64,
    pub last_stroke: i64,
}

impl CharacterProgress {
    pub fn first(
        character_id: CharacterId,
        stroke_index: i64,
        score: f64,
        scale: MasteryScale,
    ) -> Self {
        Self {
            character_id,
            attempts: 1,
            avg_score: score,
            mastery: scale.apply(score),
            last_stroke: stroke_index,
        }
    }

    /// Fold one more score into the cumulative mean.
    ///
    /// Every attempt weighs the same forever; there is no decay.
    pub fn record(&mut self, stroke_index: i64, score: f64, scale: MasteryScale) {
        let n = self.attempts as f64;
        self.avg_score = (self.avg_score * n + score) / (n + 1.0);
        self.attempts += 1;
        self.mastery = scale.apply(self.avg_score);
        self.last_stroke = self.last_stroke.max(stroke_index);
    }
}

/// Progress for one user, keyed by character
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProgress(pub BTreeMap<CharacterId, CharacterProgress>);

impl UserProgress {
    pub fn get(&self, character_id: CharacterId) -> Option<&CharacterProgress> {
        self.0.get(&character_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CharacterProgress> {
        self.0.values()
    }

    /// Apply a submission, creating the character entry on first sight
    pub fn record(
        &mut self,
        character_id: CharacterId,
        stroke_index: i64,
        score: f64,
        scale: MasteryScale,
    ) -> &CharacterProgress {
        self.0
            .entry(character_id)
            .and_modify(|p| p.record(stroke_index, score, scale))
            .or_insert_with(|| CharacterProgress::first(character_id, stroke_index, score, scale))
    }
}

/// Two-level progress table: user -> character -> progress.
///
/// Reads of an unknown user yield an empty `UserProgress`. Writes create
/// the user and character entries lazily. Nothing is ever removed.
#[derive(Debug, Clone, Default)]
pub struct ProgressBook {
    users: HashMap<UserId, UserProgress>,
    scale: MasteryScale,
}

impl ProgressBook {
    pub fn new(scale: MasteryScale) -> Self {
        Self {
            users: HashMap::new(),
            scale,
        }
    }

    pub fn record(
        &mut self,
        user_id: UserId,
        character_id: CharacterId,
        stroke_index: i64,
        score: f64,
    ) -> &CharacterProgress {
        let scale = self.scale;
        self.users
            .entry(user_id)
            .or_default()
            .record(character_id, stroke_index, score, scale)
    }

    pub fn user(&self, user_id: UserId) -> UserProgress {
        self.users.get(&user_id).cloned().unwrap_or_default()
    }
}
