use dashmap::DashMap;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::websocket::connection::ConnectionManager;
use harf_core::{
    ActiveRound, AnswerValidator, FinishOutcome, GradedAnswer, RoundStateMachine, ScoringEngine,
    draw_letter, normalize,
};
use harf_persistence::{
    RoomRepository, RoundRepository, ScoreRepository, is_unique_violation,
};
use harf_types::{
    Answer, AnswerStatus, Category, Player, PlayerId, Room, RoomError, RoomId, Round, RoundId,
    ScoreboardEntry, ServerMessage,
};

const JOIN_CODE_LENGTH: usize = 4;
const JOIN_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const JOIN_CODE_ATTEMPTS: usize = 8;

/// Per-room command sequencer. All lifecycle transitions for a room run
/// under this lock, so concurrent starts and ends serialize instead of
/// racing the database.
struct RoomSession {
    machine: RoundStateMachine,
}

pub struct RoomManager {
    rooms: RoomRepository,
    rounds: RoundRepository,
    scores: ScoreRepository,
    validator: Arc<AnswerValidator>,
    connections: Arc<ConnectionManager>,
    sessions: DashMap<RoomId, Arc<Mutex<RoomSession>>>,
}

impl RoomManager {
    pub fn new(
        db: sea_orm::DatabaseConnection,
        validator: Arc<AnswerValidator>,
        connections: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            rooms: RoomRepository::new(db.clone()),
            rounds: RoundRepository::new(db.clone()),
            scores: ScoreRepository::new(db),
            validator,
            connections,
            sessions: DashMap::new(),
        }
    }

    fn generate_join_code() -> String {
        let mut rng = rand::thread_rng();
        (0..JOIN_CODE_LENGTH)
            .map(|_| JOIN_CODE_CHARSET[rng.gen_range(0..JOIN_CODE_CHARSET.len())] as char)
            .collect()
    }

    /// Create a room with a fresh join code and seat the creator as
    /// host. Code collisions are rare at four characters; on a unique
    /// violation we draw again rather than widening the code space.
    pub async fn create_room(&self, name: &str) -> Result<(Room, Player), RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidSubmission {
                reason: "player name must not be empty".to_string(),
            });
        }

        let mut room = None;
        for _ in 0..JOIN_CODE_ATTEMPTS {
            let code = Self::generate_join_code();
            match self.rooms.create_room(&code, name).await {
                Ok(created) => {
                    room = Some(created);
                    break;
                }
                Err(err) if is_unique_violation(&err) => {
                    info!("join code {} already taken, drawing another", code);
                    continue;
                }
                Err(err) => return Err(RoomError::storage(err)),
            }
        }

        let room = room.ok_or_else(|| RoomError::Storage {
            message: "could not allocate a join code".to_string(),
        })?;

        let host = self
            .rooms
            .add_player(room.id, name, true)
            .await
            .map_err(RoomError::storage)?;

        info!("room {} created with code {}", room.id, room.code);
        Ok((room, host))
    }

    /// Join a room by code. The room's watchers learn about the new
    /// player right away; the joiner receives the full snapshot when
    /// they start watching.
    pub async fn join_room(&self, code: &str, name: &str) -> Result<(Room, Player), RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidSubmission {
                reason: "player name must not be empty".to_string(),
            });
        }

        let room = self
            .rooms
            .find_by_code(code)
            .await
            .map_err(RoomError::storage)?
            .ok_or(RoomError::RoomNotFound)?;

        let player = self
            .rooms
            .add_player(room.id, name, false)
            .await
            .map_err(RoomError::storage)?;

        self.connections
            .send_to_room(
                room.id,
                ServerMessage::PlayerJoined {
                    player: player.clone(),
                },
            )
            .await;

        Ok((room, player))
    }

    /// Get or build the room's sequencer. Built lazily from storage so
    /// a restarted server picks up rooms, numbering, and any round that
    /// was in flight.
    async fn room_session(&self, room_id: RoomId) -> Result<Arc<Mutex<RoomSession>>, RoomError> {
        if let Some(session) = self.sessions.get(&room_id) {
            return Ok(session.clone());
        }

        self.rooms
            .find_by_id(room_id)
            .await
            .map_err(RoomError::storage)?
            .ok_or(RoomError::RoomNotFound)?;

        let host = self
            .rooms
            .host_of(room_id)
            .await
            .map_err(RoomError::storage)?
            .ok_or(RoomError::PlayerNotFound)?;

        let last_number = self
            .rounds
            .max_round_number(room_id)
            .await
            .map_err(RoomError::storage)?;

        let mut machine = RoundStateMachine::new(room_id, host.id, last_number);

        if let Some(active) = self
            .rounds
            .active_round(room_id)
            .await
            .map_err(RoomError::storage)?
        {
            machine.hydrate(ActiveRound {
                id: active.id,
                number: active.round_number,
                letter: active.letter.chars().next().unwrap_or('ا'),
                started_at: chrono::DateTime::parse_from_rfc3339(&active.started_at)
                    .map(SystemTime::from)
                    .unwrap_or_else(|_| SystemTime::now()),
            });
            info!("rehydrated active round {} for room {}", active.id, room_id);
        }

        let session = Arc::new(Mutex::new(RoomSession { machine }));
        Ok(self
            .sessions
            .entry(room_id)
            .or_insert(session)
            .value()
            .clone())
    }

    /// Host-only: draw a letter and open a round. The machine transition
    /// and the insert happen under the room lock, so two racing starts
    /// resolve to one started round and one conflict error.
    pub async fn start_round(&self, room_id: RoomId, caller: PlayerId) -> Result<Round, RoomError> {
        let session = self.room_session(room_id).await?;
        let mut session = session.lock().await;

        let round_id = Uuid::new_v4();
        let letter = draw_letter();
        let started = session.machine.start(caller, round_id, letter)?;
        let number = started.number;

        let round = match self.rounds.create_round(round_id, room_id, number, letter).await {
            Ok(round) => round,
            Err(err) => {
                // Undo the in-memory transition so the room is not stuck
                // with a round storage never saw.
                let _ = session.machine.finish(round_id);
                return Err(RoomError::storage(err));
            }
        };

        info!(
            "round {} started in room {} with letter {}",
            number, room_id, letter
        );
        self.connections
            .send_to_room(
                room_id,
                ServerMessage::RoundStarted {
                    round: round.clone(),
                },
            )
            .await;

        Ok(round)
    }

    /// Submit one player's answers for the active round, at most one
    /// per category. The whole batch is accepted or rejected; grading
    /// then runs outside the room lock because oracle lookups can be
    /// slow. With `finish` set, the round ends once this player's
    /// answers are graded.
    pub async fn submit_answers(
        &self,
        room_id: RoomId,
        round_id: RoundId,
        player_id: PlayerId,
        entries: &HashMap<Category, String>,
        finish: bool,
    ) -> Result<Vec<Answer>, RoomError> {
        let entries: Vec<(Category, String)> = entries
            .iter()
            .map(|(category, word)| (*category, word.trim().to_string()))
            .filter(|(_, word)| !word.is_empty())
            .collect();

        if entries.is_empty() {
            return Err(RoomError::InvalidSubmission {
                reason: "no non-empty answers submitted".to_string(),
            });
        }

        self.rooms
            .find_player(player_id)
            .await
            .map_err(RoomError::storage)?
            .filter(|player| player.room_id == room_id)
            .ok_or(RoomError::PlayerNotFound)?;

        let session = self.room_session(room_id).await?;
        let (letter, pending) = {
            let session = session.lock().await;

            let letter = match session.machine.active() {
                Some(active) if active.id == round_id => active.letter,
                _ => return Err(RoomError::RoundNotFound),
            };

            // All-or-nothing: reject the whole batch before inserting
            // anything if any category was already answered.
            let existing = self
                .rounds
                .answers_for_round(round_id)
                .await
                .map_err(RoomError::storage)?;
            for (category, _) in &entries {
                let taken = existing
                    .iter()
                    .any(|answer| answer.player_id == player_id && answer.category == *category);
                if taken {
                    return Err(RoomError::DuplicateAnswer {
                        category: category.as_str().to_string(),
                    });
                }
            }

            let mut pending = Vec::with_capacity(entries.len());
            for (category, word) in &entries {
                match self
                    .rounds
                    .insert_answer(round_id, player_id, *category, word)
                    .await
                {
                    Ok(answer) => pending.push(answer),
                    Err(err) if is_unique_violation(&err) => {
                        return Err(RoomError::DuplicateAnswer {
                            category: category.as_str().to_string(),
                        });
                    }
                    Err(err) => return Err(RoomError::storage(err)),
                }
            }

            (letter, pending)
        };

        // Grading happens outside the lock; the row is already pending
        // so a concurrent round end counts it invalid rather than
        // waiting for it.
        let mut graded = Vec::with_capacity(pending.len());
        for answer in pending {
            let verdict = self
                .validator
                .validate(&answer.word, answer.category, letter)
                .await;
            let status = if verdict.is_valid {
                AnswerStatus::Valid
            } else {
                AnswerStatus::Invalid
            };
            info!(
                "answer {} in round {} judged {:?} by {:?}",
                answer.id, round_id, status, verdict.source
            );

            let applied = self
                .rounds
                .grade_answer(answer.id, status)
                .await
                .map_err(RoomError::storage)?;
            // The round may have ended mid-grade and swept this answer
            // to invalid; report what storage holds.
            let status = if applied { status } else { AnswerStatus::Invalid };

            let answer = Answer { status, ..answer };
            self.connections
                .send_to_room(
                    room_id,
                    ServerMessage::AnswerGraded {
                        answer: answer.clone(),
                    },
                )
                .await;
            graded.push(answer);
        }

        if finish {
            self.end_round(room_id, round_id).await?;
        }

        Ok(graded)
    }

    /// End a round and apply scoring exactly once. Any player may end;
    /// the first finisher ends the round for everyone. Duplicate end
    /// signals, including for rounds ended before this process started,
    /// return the scoreboard without re-scoring.
    pub async fn end_round(
        &self,
        room_id: RoomId,
        round_id: RoundId,
    ) -> Result<Vec<ScoreboardEntry>, RoomError> {
        let session = self.room_session(room_id).await?;
        let mut session = session.lock().await;

        match session.machine.finish(round_id) {
            Ok(FinishOutcome::Finished(ended)) => {
                // The conditional update is the storage-level guard; a
                // false here means another process already ended it.
                let newly_ended = match self.rounds.finish_round(round_id).await {
                    Ok(newly_ended) => newly_ended,
                    Err(err) => {
                        // Storage still shows the round open. Put it
                        // back in the machine so no second round can
                        // start on top of it and a later end signal
                        // retries cleanly.
                        session.machine.hydrate(ended);
                        return Err(RoomError::storage(err));
                    }
                };

                if newly_ended {
                    self.score_round(room_id, round_id).await?;
                }

                let scoreboard = self
                    .scores
                    .scoreboard(room_id)
                    .await
                    .map_err(RoomError::storage)?;

                self.connections
                    .send_to_room(
                        room_id,
                        ServerMessage::RoundEnded {
                            round_id,
                            scoreboard: scoreboard.clone(),
                        },
                    )
                    .await;

                Ok(scoreboard)
            }
            Ok(FinishOutcome::AlreadyEnded) => self
                .scores
                .scoreboard(room_id)
                .await
                .map_err(RoomError::storage),
            Err(RoomError::RoundNotFound) => {
                // The machine only remembers rounds it saw; rounds ended
                // before this process still resolve against storage.
                let round = self
                    .rounds
                    .find_by_id(round_id)
                    .await
                    .map_err(RoomError::storage)?
                    .filter(|round| round.room_id == room_id)
                    .ok_or(RoomError::RoundNotFound)?;

                if round.is_active() {
                    return Err(RoomError::RoundNotFound);
                }

                self.scores
                    .scoreboard(room_id)
                    .await
                    .map_err(RoomError::storage)
            }
            Err(err) => Err(err),
        }
    }

    /// Scoring pass for a round that just ended, run while the room
    /// lock is held. Still-pending answers count invalid, shared valid
    /// words score 5, unique valid words score 10, and every player in
    /// the room gets a delta applied so zero rounds still create score
    /// rows.
    async fn score_round(&self, room_id: RoomId, round_id: RoundId) -> Result<(), RoomError> {
        let swept = self
            .rounds
            .mark_pending_invalid(round_id)
            .await
            .map_err(RoomError::storage)?;
        if swept > 0 {
            warn!(
                "{} answers were still pending when round {} ended",
                swept, round_id
            );
        }

        let answers = self
            .rounds
            .answers_for_round(round_id)
            .await
            .map_err(RoomError::storage)?;

        let graded: Vec<GradedAnswer> = answers
            .iter()
            .map(|answer| GradedAnswer {
                player_id: answer.player_id,
                word: normalize(&answer.word),
                status: answer.status,
            })
            .collect();

        let deltas = ScoringEngine::score_round(&graded);

        let roster = self
            .rooms
            .list_players(room_id)
            .await
            .map_err(RoomError::storage)?;

        for player in roster {
            let delta = deltas.get(&player.id).copied().unwrap_or(0);
            self.scores
                .add_points(room_id, player.id, delta)
                .await
                .map_err(RoomError::storage)?;
        }

        info!("round {} in room {} scored", round_id, room_id);
        Ok(())
    }

    /// Close out rounds that have run past the cap. Candidates come
    /// from storage, not the session map, so rounds abandoned before a
    /// restart are swept too; `end_round` rebuilds their sequencers on
    /// the way through.
    pub async fn finish_overdue_rounds(&self, max_age: Duration) {
        let open = match self.rounds.open_rounds().await {
            Ok(open) => open,
            Err(err) => {
                error!("overdue round scan failed: {}", err);
                return;
            }
        };

        for round in open {
            let started = chrono::DateTime::parse_from_rfc3339(&round.started_at)
                .map(SystemTime::from)
                .unwrap_or_else(|_| SystemTime::now());
            if started.elapsed().unwrap_or(Duration::ZERO) <= max_age {
                continue;
            }

            info!(
                "force-ending overdue round {} in room {}",
                round.id, round.room_id
            );
            if let Err(err) = self.end_round(round.room_id, round.id).await {
                error!(
                    "failed to force-end round {} in room {}: {}",
                    round.id, round.room_id, err
                );
            }
        }
    }

    // Read-side queries, used by the HTTP endpoints and the WatchRoom
    // snapshot.

    pub async fn get_room(&self, room_id: RoomId) -> Result<Room, RoomError> {
        self.rooms
            .find_by_id(room_id)
            .await
            .map_err(RoomError::storage)?
            .ok_or(RoomError::RoomNotFound)
    }

    pub async fn list_players(&self, room_id: RoomId) -> Result<Vec<Player>, RoomError> {
        self.get_room(room_id).await?;
        self.rooms
            .list_players(room_id)
            .await
            .map_err(RoomError::storage)
    }

    pub async fn active_round(&self, room_id: RoomId) -> Result<Option<Round>, RoomError> {
        self.get_room(room_id).await?;
        self.rounds
            .active_round(room_id)
            .await
            .map_err(RoomError::storage)
    }

    pub async fn scoreboard(&self, room_id: RoomId) -> Result<Vec<ScoreboardEntry>, RoomError> {
        self.get_room(room_id).await?;
        self.scores
            .scoreboard(room_id)
            .await
            .map_err(RoomError::storage)
    }

    /// Full-state snapshot for a reconnecting or newly watching client.
    pub async fn room_state(&self, room_id: RoomId) -> Result<ServerMessage, RoomError> {
        let room = self.get_room(room_id).await?;
        let players = self
            .rooms
            .list_players(room_id)
            .await
            .map_err(RoomError::storage)?;
        let active_round = self
            .rounds
            .active_round(room_id)
            .await
            .map_err(RoomError::storage)?;
        let scoreboard = self
            .scores
            .scoreboard(room_id)
            .await
            .map_err(RoomError::storage)?;

        Ok(ServerMessage::RoomState {
            room,
            players,
            active_round,
            scoreboard,
        })
    }
}
