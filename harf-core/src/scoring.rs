use harf_types::{AnswerStatus, PlayerId};
use std::collections::HashMap;

pub const UNIQUE_WORD_POINTS: i32 = 10;
pub const SHARED_WORD_POINTS: i32 = 5;

/// One graded answer as fed into scoring. `word` must already be
/// normalized; shared-word grouping is exact equality on this form.
#[derive(Debug, Clone)]
pub struct GradedAnswer {
    pub player_id: PlayerId,
    pub word: String,
    pub status: AnswerStatus,
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Aggregate a finished round's answers into per-player point
    /// deltas. A valid word submitted by exactly one player scores 10;
    /// a word shared by several players scores 5 for each of them.
    /// Invalid and pending answers contribute zero, but every player
    /// with at least one answer gets an entry so score rows can be
    /// created even for a zero round.
    pub fn score_round(answers: &[GradedAnswer]) -> HashMap<PlayerId, i32> {
        let mut word_counts: HashMap<&str, u32> = HashMap::new();
        for answer in answers {
            if answer.status == AnswerStatus::Valid {
                *word_counts.entry(answer.word.as_str()).or_insert(0) += 1;
            }
        }

        let mut deltas: HashMap<PlayerId, i32> = HashMap::new();
        for answer in answers {
            let entry = deltas.entry(answer.player_id).or_insert(0);
            if answer.status != AnswerStatus::Valid {
                continue;
            }
            let shared = word_counts.get(answer.word.as_str()).copied().unwrap_or(0) > 1;
            *entry += if shared {
                SHARED_WORD_POINTS
            } else {
                UNIQUE_WORD_POINTS
            };
        }

        deltas
    }
}
