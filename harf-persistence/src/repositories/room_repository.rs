use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::entities::{players, prelude::*, rooms};
use harf_types::{Player, Room};

#[derive(Clone)]
pub struct RoomRepository {
    db: DatabaseConnection,
}

impl RoomRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_room(model: rooms::Model) -> Room {
        Room {
            id: model.id,
            code: model.code,
            created_by: model.created_by,
            created_at: model.created_at.to_rfc3339(),
        }
    }

    fn model_to_player(model: players::Model) -> Player {
        Player {
            id: model.id,
            room_id: model.room_id,
            name: model.name,
            is_host: model.is_host,
        }
    }

    /// Insert a room and return the created row in one operation.
    /// Codes are stored uppercase; the unique index on `code` rejects a
    /// collision with a live room.
    pub async fn create_room(&self, code: &str, created_by: &str) -> Result<Room, sea_orm::DbErr> {
        let model = rooms::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.trim().to_uppercase()),
            created_by: Set(created_by.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        }
        .insert(&self.db)
        .await?;

        Ok(Self::model_to_room(model))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        let model = Rooms::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Self::model_to_room))
    }

    /// Case-insensitive join-code lookup.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Room>> {
        let model = Rooms::find()
            .filter(rooms::Column::Code.eq(code.trim().to_uppercase()))
            .one(&self.db)
            .await?;

        Ok(model.map(Self::model_to_room))
    }

    pub async fn add_player(&self, room_id: Uuid, name: &str, is_host: bool) -> Result<Player> {
        let model = players::ActiveModel {
            id: Set(Uuid::new_v4()),
            room_id: Set(room_id),
            name: Set(name.to_string()),
            is_host: Set(is_host),
            joined_at: Set(chrono::Utc::now().into()),
        }
        .insert(&self.db)
        .await?;

        Ok(Self::model_to_player(model))
    }

    pub async fn find_player(&self, player_id: Uuid) -> Result<Option<Player>> {
        let model = Players::find_by_id(player_id).one(&self.db).await?;
        Ok(model.map(Self::model_to_player))
    }

    pub async fn list_players(&self, room_id: Uuid) -> Result<Vec<Player>> {
        let models = Players::find()
            .filter(players::Column::RoomId.eq(room_id))
            .order_by_asc(players::Column::JoinedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Self::model_to_player).collect())
    }

    pub async fn host_of(&self, room_id: Uuid) -> Result<Option<Player>> {
        let model = Players::find()
            .filter(players::Column::RoomId.eq(room_id))
            .filter(players::Column::IsHost.eq(true))
            .one(&self.db)
            .await?;

        Ok(model.map(Self::model_to_player))
    }
}
