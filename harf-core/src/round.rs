use harf_types::{PlayerId, RoomError, RoomId, RoundId};
use rand::Rng;
use std::time::SystemTime;

/// The 28-letter alphabet rounds draw from.
pub const LETTER_ALPHABET: &str = "ابتثجحخدذرزسشصضطظعغفقكلمنهوي";

/// Draw a round letter uniformly at random. Letters may repeat across
/// consecutive rounds; the game has no repetition-avoidance.
pub fn draw_letter() -> char {
    let letters: Vec<char> = LETTER_ALPHABET.chars().collect();
    let index = rand::thread_rng().gen_range(0..letters.len());
    letters[index]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Active,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRound {
    pub id: RoundId,
    pub number: i64,
    pub letter: char,
    pub started_at: SystemTime,
}

#[derive(Debug, PartialEq)]
pub enum FinishOutcome {
    /// The round transitioned Active -> Ended. Scoring must run before
    /// the end is acknowledged to callers.
    Finished(ActiveRound),
    /// The round was already ended; duplicate end signals are no-ops.
    AlreadyEnded,
}

/// Governs one room's round lifecycle. All transitions must happen
/// under the room's sequencer; the machine itself is not synchronized.
#[derive(Debug)]
pub struct RoundStateMachine {
    room_id: RoomId,
    host: PlayerId,
    current: Option<ActiveRound>,
    last_number: i64,
    last_ended: Option<RoundId>,
}

impl RoundStateMachine {
    pub fn new(room_id: RoomId, host: PlayerId, last_number: i64) -> Self {
        Self {
            room_id,
            host,
            current: None,
            last_number,
            last_ended: None,
        }
    }

    /// Restore an active round loaded from storage, e.g. after a server
    /// restart while a round was in flight.
    pub fn hydrate(&mut self, round: ActiveRound) {
        self.last_number = self.last_number.max(round.number);
        self.current = Some(round);
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn host(&self) -> PlayerId {
        self.host
    }

    pub fn phase(&self) -> RoundPhase {
        if self.current.is_some() {
            RoundPhase::Active
        } else {
            RoundPhase::Idle
        }
    }

    pub fn active(&self) -> Option<&ActiveRound> {
        self.current.as_ref()
    }

    /// Start a new round. Only the host may start, and only while no
    /// round is active. Round numbers are previous max + 1.
    pub fn start(
        &mut self,
        caller: PlayerId,
        round_id: RoundId,
        letter: char,
    ) -> Result<&ActiveRound, RoomError> {
        if caller != self.host {
            return Err(RoomError::NotHost);
        }
        if self.current.is_some() {
            return Err(RoomError::RoundAlreadyActive);
        }

        self.last_number += 1;
        Ok(self.current.insert(ActiveRound {
            id: round_id,
            number: self.last_number,
            letter,
            started_at: SystemTime::now(),
        }))
    }

    /// Transition Active -> Ended. Ending a round that already ended is
    /// a no-op so that duplicate end signals stay invisible to callers.
    /// Unknown round ids are an error; the caller may still resolve
    /// them against storage for rounds ended before this process.
    pub fn finish(&mut self, round_id: RoundId) -> Result<FinishOutcome, RoomError> {
        match self.current.take() {
            Some(ended) if ended.id == round_id => {
                self.last_ended = Some(ended.id);
                Ok(FinishOutcome::Finished(ended))
            }
            other => {
                self.current = other;
                if self.last_ended == Some(round_id) {
                    Ok(FinishOutcome::AlreadyEnded)
                } else {
                    Err(RoomError::RoundNotFound)
                }
            }
        }
    }
}
