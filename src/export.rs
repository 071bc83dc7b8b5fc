use itertools::Itertools;
use std::cmp::Ordering;
use std::io::Write;

use crate::attempt::Attempt;
use crate::error::Result;
use crate::progress::{CharacterProgress, UserProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SortBy {
    Character,
    Attempts,
    Mastery,
}

/// Progress entries ordered for display
pub fn progress_rows(
    progress: &UserProgress,
    sort_by: SortBy,
    ascending: bool,
) -> Vec<CharacterProgress> {
    progress
        .iter()
        .cloned()
        .sorted_by(|a, b| {
            let ord = match sort_by {
                SortBy::Character => a.character_id.cmp(&b.character_id),
                SortBy::Attempts => a.attempts.cmp(&b.attempts),
                SortBy::Mastery => a
                    .mastery
                    .partial_cmp(&b.mastery)
                    .unwrap_or(Ordering::Equal),
            }
            .then(a.character_id.cmp(&b.character_id));
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        })
        .collect()
}

/// Plain-text progress table
pub fn render_progress_table(rows: &[CharacterProgress]) -> String {
    let mut out = format!(
        "{:>9}  {:>8}  {:>9}  {:>7}  {:>11}\n",
        "character", "attempts", "avg score", "mastery", "last stroke"
    );
    for p in rows {
        out.push_str(&format!(
            "{:>9}  {:>8}  {:>9.3}  {:>7.1}  {:>11}\n",
            p.character_id, p.attempts, p.avg_score, p.mastery, p.last_stroke
        ));
    }
    out
}

/// Write attempts as CSV, one row per attempt, oldest first
pub fn write_history_csv<W: Write>(attempts: &[Attempt], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "id",
        "characterId",
        "strokeIndex",
        "score",
        "createdAt",
        "points",
    ])?;

    for a in attempts {
        let points = serde_json::to_string(&a.path)?;
        wtr.write_record([
            a.id.to_string(),
            a.character_id.to_string(),
            a.stroke_index.to_string(),
            a.score.to_string(),
            a.created_at.to_rfc3339(),
            points,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
