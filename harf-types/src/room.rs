use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub type RoomId = Uuid;
pub type PlayerId = Uuid;

/// A shared game session, joined by a short human-entered code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Room {
    pub id: RoomId,
    /// Uppercase join code, unique among live rooms.
    pub code: String,
    pub created_by: String,
    pub created_at: String, // ISO 8601 string
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Player {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub name: String,
    pub is_host: bool,
}

/// One row of a room's scoreboard. Every player in the room appears,
/// including players who have not scored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScoreboardEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub total_points: i32,
}
