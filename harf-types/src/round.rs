use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::{PlayerId, RoomId};

pub type RoundId = Uuid;
pub type AnswerId = Uuid;

/// The fixed category set every round is played against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Name,
    Country,
    Animal,
    Plant,
    Object,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Name,
        Category::Country,
        Category::Animal,
        Category::Plant,
        Category::Object,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Name => "name",
            Category::Country => "country",
            Category::Animal => "animal",
            Category::Plant => "plant",
            Category::Object => "object",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "name" => Some(Category::Name),
            "country" => Some(Category::Country),
            "animal" => Some(Category::Animal),
            "plant" => Some(Category::Plant),
            "object" => Some(Category::Object),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One letter-challenge instance within a room. At most one round per
/// room has `ended_at == None` at any instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Round {
    pub id: RoundId,
    pub room_id: RoomId,
    /// Strictly increasing per room.
    pub round_number: i64,
    /// A single letter from the game alphabet.
    pub letter: String,
    pub started_at: String,         // ISO 8601 string
    pub ended_at: Option<String>,   // ISO 8601 string
}

impl Round {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Pending,
    Valid,
    Invalid,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::Pending => "pending",
            AnswerStatus::Valid => "valid",
            AnswerStatus::Invalid => "invalid",
        }
    }

    pub fn parse(s: &str) -> Option<AnswerStatus> {
        match s {
            "pending" => Some(AnswerStatus::Pending),
            "valid" => Some(AnswerStatus::Valid),
            "invalid" => Some(AnswerStatus::Invalid),
            _ => None,
        }
    }
}

/// One player's submitted word for one category in one round. Created
/// `pending` and graded exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Answer {
    pub id: AnswerId,
    pub round_id: RoundId,
    pub player_id: PlayerId,
    pub category: Category,
    /// The word as submitted, before normalization.
    pub word: String,
    pub status: AnswerStatus,
}
