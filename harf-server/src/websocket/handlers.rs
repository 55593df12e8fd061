use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::room_manager::RoomManager;
use crate::session::SessionService;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use harf_types::{Category, ClientMessage, RoomError, RoomId, RoundId, ServerMessage};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    session_service: Arc<SessionService>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        room_manager: Arc<RoomManager>,
        session_service: Arc<SessionService>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            room_manager,
            session_service,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        // Update connection activity
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        let result = match message {
            ClientMessage::CreateRoom { name } => self.handle_create_room(name).await,
            ClientMessage::JoinRoom { code, name } => self.handle_join_room(code, name).await,
            ClientMessage::WatchRoom {
                room_id,
                session_token,
            } => self.handle_watch_room(room_id, session_token).await,
            ClientMessage::StartRound {
                room_id,
                session_token,
            } => self.handle_start_round(room_id, session_token).await,
            ClientMessage::SubmitAnswers {
                room_id,
                round_id,
                session_token,
                entries,
                finish,
            } => {
                self.handle_submit_answers(room_id, round_id, session_token, entries, finish)
                    .await
            }
            ClientMessage::EndRound {
                room_id,
                round_id,
                session_token,
            } => self.handle_end_round(room_id, round_id, session_token).await,
            ClientMessage::Heartbeat => Ok(()),
        };

        // Command failures go back to the caller as messages; only
        // transport problems bubble up and drop the connection.
        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!(
                    "command failed for connection {}: {}",
                    self.connection_id, error
                );
                self.send_message(ServerMessage::Error { error }).await
            }
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);
    }

    async fn handle_create_room(&self, name: String) -> Result<(), RoomError> {
        let (room, player) = self.room_manager.create_room(&name).await?;
        let session_token = self.session_service.issue(player.id, room.id).await;

        // The creator watches their room immediately.
        self.connection_manager
            .watch_room(self.connection_id, room.id, player.id)
            .await;

        self.send_message(ServerMessage::RoomCreated {
            room,
            player,
            session_token,
        })
        .await
        .map_err(|_| RoomError::Storage {
            message: "connection closed".to_string(),
        })
    }

    async fn handle_join_room(&self, code: String, name: String) -> Result<(), RoomError> {
        let (room, player) = self.room_manager.join_room(&code, &name).await?;
        let session_token = self.session_service.issue(player.id, room.id).await;

        self.connection_manager
            .watch_room(self.connection_id, room.id, player.id)
            .await;

        self.send_message(ServerMessage::RoomJoined {
            room,
            player,
            session_token,
        })
        .await
        .map_err(|_| RoomError::Storage {
            message: "connection closed".to_string(),
        })
    }

    async fn handle_watch_room(
        &self,
        room_id: RoomId,
        session_token: String,
    ) -> Result<(), RoomError> {
        let player_id = self
            .session_service
            .authorize(&session_token, room_id)
            .await?;

        self.connection_manager
            .watch_room(self.connection_id, room_id, player_id)
            .await;

        // The snapshot replaces any events missed while disconnected.
        let snapshot = self.room_manager.room_state(room_id).await?;
        self.send_message(snapshot).await.map_err(|_| RoomError::Storage {
            message: "connection closed".to_string(),
        })
    }

    async fn handle_start_round(
        &self,
        room_id: RoomId,
        session_token: String,
    ) -> Result<(), RoomError> {
        let caller = self
            .session_service
            .authorize(&session_token, room_id)
            .await?;

        // The started round reaches this connection through the room
        // broadcast, so no direct reply is needed.
        self.room_manager.start_round(room_id, caller).await?;
        Ok(())
    }

    async fn handle_submit_answers(
        &self,
        room_id: RoomId,
        round_id: RoundId,
        session_token: String,
        entries: HashMap<Category, String>,
        finish: bool,
    ) -> Result<(), RoomError> {
        let player_id = self
            .session_service
            .authorize(&session_token, room_id)
            .await?;

        self.room_manager
            .submit_answers(room_id, round_id, player_id, &entries, finish)
            .await?;
        Ok(())
    }

    async fn handle_end_round(
        &self,
        room_id: RoomId,
        round_id: RoundId,
        session_token: String,
    ) -> Result<(), RoomError> {
        self.session_service
            .authorize(&session_token, room_id)
            .await?;

        self.room_manager.end_round(room_id, round_id).await?;
        Ok(())
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }
}
