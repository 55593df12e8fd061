use anyhow::Result;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{players, prelude::*, scores};
use harf_types::ScoreboardEntry;

#[derive(Clone)]
pub struct ScoreRepository {
    db: DatabaseConnection,
}

impl ScoreRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Add a round delta to a player's cumulative total as an atomic
    /// in-place update, creating the row on first score. Avoids the
    /// read-then-write race of loading the total and saving it back.
    pub async fn add_points(&self, room_id: Uuid, player_id: Uuid, delta: i32) -> Result<()> {
        let updated = Scores::update_many()
            .col_expr(
                scores::Column::TotalPoints,
                Expr::col(scores::Column::TotalPoints).add(delta),
            )
            .filter(scores::Column::RoomId.eq(room_id))
            .filter(scores::Column::PlayerId.eq(player_id))
            .exec(&self.db)
            .await?;

        if updated.rows_affected == 0 {
            scores::ActiveModel {
                id: Set(Uuid::new_v4()),
                room_id: Set(room_id),
                player_id: Set(player_id),
                total_points: Set(delta),
            }
            .insert(&self.db)
            .await?;
        }

        Ok(())
    }

    pub async fn total_for(&self, room_id: Uuid, player_id: Uuid) -> Result<i32> {
        let row = Scores::find()
            .filter(scores::Column::RoomId.eq(room_id))
            .filter(scores::Column::PlayerId.eq(player_id))
            .one(&self.db)
            .await?;

        Ok(row.map(|score| score.total_points).unwrap_or(0))
    }

    /// Scoreboard for a room, descending by points. Players without a
    /// scores row yet are listed with zero so the board is complete.
    pub async fn scoreboard(&self, room_id: Uuid) -> Result<Vec<ScoreboardEntry>> {
        let players = Players::find()
            .filter(players::Column::RoomId.eq(room_id))
            .order_by_asc(players::Column::JoinedAt)
            .all(&self.db)
            .await?;

        let totals: HashMap<Uuid, i32> = Scores::find()
            .filter(scores::Column::RoomId.eq(room_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|score| (score.player_id, score.total_points))
            .collect();

        let mut entries: Vec<ScoreboardEntry> = players
            .into_iter()
            .map(|player| ScoreboardEntry {
                player_id: player.id,
                total_points: totals.get(&player.id).copied().unwrap_or(0),
                name: player.name,
            })
            .collect();

        entries.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        Ok(entries)
    }
}
