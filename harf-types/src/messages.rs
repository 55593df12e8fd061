use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::{Answer, Category, Player, Room, RoomError, RoomId, Round, RoundId, ScoreboardEntry};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    CreateRoom {
        name: String,
    },
    JoinRoom {
        code: String,
        name: String,
    },
    /// Subscribe this connection to a room's event stream. Replaces any
    /// previous subscription held by the connection.
    WatchRoom {
        room_id: RoomId,
        session_token: String,
    },
    StartRound {
        room_id: RoomId,
        session_token: String,
    },
    SubmitAnswers {
        room_id: RoomId,
        round_id: RoundId,
        session_token: String,
        entries: HashMap<Category, String>,
        /// End the round once the caller's own entries are graded.
        finish: bool,
    },
    EndRound {
        room_id: RoomId,
        round_id: RoundId,
        session_token: String,
    },
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    RoomCreated {
        room: Room,
        player: Player,
        session_token: String,
    },
    RoomJoined {
        room: Room,
        player: Player,
        session_token: String,
    },
    /// Full-state snapshot, sent on WatchRoom. Reconnecting clients
    /// rely on this instead of replaying missed events.
    RoomState {
        room: Room,
        players: Vec<Player>,
        active_round: Option<Round>,
        scoreboard: Vec<ScoreboardEntry>,
    },
    PlayerJoined {
        player: Player,
    },
    RoundStarted {
        round: Round,
    },
    AnswerGraded {
        answer: Answer,
    },
    /// Scores are already persisted when this is published, so
    /// re-delivery cannot double-apply them.
    RoundEnded {
        round_id: RoundId,
        scoreboard: Vec<ScoreboardEntry>,
    },
    Error {
        error: RoomError,
    },
}
