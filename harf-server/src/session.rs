use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use harf_types::{PlayerId, RoomError, RoomId};

#[derive(Debug, Clone, Copy)]
struct Session {
    player_id: PlayerId,
    room_id: RoomId,
    last_used: Instant,
}

/// Opaque per-player session tokens, minted when a player creates or
/// joins a room and required by every later command. Tokens carry no
/// information themselves; the mapping lives server-side only, so a
/// restart invalidates all sessions and players re-join by code.
pub struct SessionService {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionService {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn issue(&self, player_id: PlayerId, room_id: RoomId) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            token.clone(),
            Session {
                player_id,
                room_id,
                last_used: Instant::now(),
            },
        );
        token
    }

    /// Resolve a token to its player, checking it was minted for the
    /// room being acted on. Tokens for other rooms are as invalid as
    /// unknown ones. Successful use refreshes the token's idle clock.
    pub async fn authorize(&self, token: &str, room_id: RoomId) -> Result<PlayerId, RoomError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(token) {
            Some(session) if session.room_id == room_id => {
                session.last_used = Instant::now();
                Ok(session.player_id)
            }
            _ => Err(RoomError::InvalidSession),
        }
    }

    pub async fn revoke(&self, token: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(token);
    }

    /// Drop tokens that have sat unused past the cap, so the map does
    /// not accumulate sessions for rooms nobody plays in anymore. Runs
    /// from the same sweep task as connection and round cleanup.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_used.elapsed() <= max_idle);
        before - sessions.len()
    }
}

impl Default for SessionService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issued_token_authorizes_its_room() {
        let service = SessionService::new();
        let player_id = Uuid::new_v4();
        let room_id = Uuid::new_v4();

        let token = service.issue(player_id, room_id).await;
        let resolved = service.authorize(&token, room_id).await.unwrap();
        assert_eq!(resolved, player_id);
    }

    #[tokio::test]
    async fn test_token_is_scoped_to_one_room() {
        let service = SessionService::new();
        let token = service.issue(Uuid::new_v4(), Uuid::new_v4()).await;

        let other_room = Uuid::new_v4();
        let result = service.authorize(&token, other_room).await;
        assert_eq!(result.unwrap_err(), RoomError::InvalidSession);
    }

    #[tokio::test]
    async fn test_unknown_and_revoked_tokens_are_rejected() {
        let service = SessionService::new();
        let room_id = Uuid::new_v4();

        let result = service.authorize("not-a-token", room_id).await;
        assert_eq!(result.unwrap_err(), RoomError::InvalidSession);

        let token = service.issue(Uuid::new_v4(), room_id).await;
        service.revoke(&token).await;
        let result = service.authorize(&token, room_id).await;
        assert_eq!(result.unwrap_err(), RoomError::InvalidSession);
    }

    #[tokio::test]
    async fn test_idle_tokens_are_swept() {
        let service = SessionService::new();
        let room_id = Uuid::new_v4();
        let token = service.issue(Uuid::new_v4(), room_id).await;

        // A generous cap keeps a fresh token alive.
        assert_eq!(service.sweep_idle(Duration::from_secs(60)).await, 0);
        service.authorize(&token, room_id).await.unwrap();

        // A zero cap treats every token as idle.
        assert_eq!(service.sweep_idle(Duration::ZERO).await, 1);
        let result = service.authorize(&token, room_id).await;
        assert_eq!(result.unwrap_err(), RoomError::InvalidSession);
    }
}
