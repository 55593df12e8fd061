use anyhow::{anyhow, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::entities::{answers, prelude::*, rounds};
use harf_types::{Answer, AnswerStatus, Category, Round};

#[derive(Clone)]
pub struct RoundRepository {
    db: DatabaseConnection,
}

impl RoundRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_round(model: rounds::Model) -> Round {
        Round {
            id: model.id,
            room_id: model.room_id,
            round_number: model.round_number,
            letter: model.letter,
            started_at: model.started_at.to_rfc3339(),
            ended_at: model.ended_at.map(|t| t.to_rfc3339()),
        }
    }

    fn model_to_answer(model: answers::Model) -> Result<Answer> {
        let category = Category::parse(&model.category)
            .ok_or_else(|| anyhow!("unknown category in answers row: {}", model.category))?;
        let status = AnswerStatus::parse(&model.result)
            .ok_or_else(|| anyhow!("unknown result in answers row: {}", model.result))?;

        Ok(Answer {
            id: model.id,
            round_id: model.round_id,
            player_id: model.player_id,
            category,
            word: model.word,
            status,
        })
    }

    pub async fn create_round(
        &self,
        id: Uuid,
        room_id: Uuid,
        round_number: i64,
        letter: char,
    ) -> Result<Round> {
        let model = rounds::ActiveModel {
            id: Set(id),
            room_id: Set(room_id),
            round_number: Set(round_number),
            letter: Set(letter.to_string()),
            started_at: Set(chrono::Utc::now().into()),
            ended_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        Ok(Self::model_to_round(model))
    }

    pub async fn find_by_id(&self, round_id: Uuid) -> Result<Option<Round>> {
        let model = Rounds::find_by_id(round_id).one(&self.db).await?;
        Ok(model.map(Self::model_to_round))
    }

    /// The room's round with a null end time, if any.
    pub async fn active_round(&self, room_id: Uuid) -> Result<Option<Round>> {
        let model = Rounds::find()
            .filter(rounds::Column::RoomId.eq(room_id))
            .filter(rounds::Column::EndedAt.is_null())
            .one(&self.db)
            .await?;

        Ok(model.map(Self::model_to_round))
    }

    /// Every round with a null end time, across all rooms. Drives the
    /// overdue sweep, so rounds abandoned before a restart still close.
    pub async fn open_rounds(&self) -> Result<Vec<Round>> {
        let models = Rounds::find()
            .filter(rounds::Column::EndedAt.is_null())
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Self::model_to_round).collect())
    }

    pub async fn max_round_number(&self, room_id: Uuid) -> Result<i64> {
        let latest = Rounds::find()
            .filter(rounds::Column::RoomId.eq(room_id))
            .order_by_desc(rounds::Column::RoundNumber)
            .one(&self.db)
            .await?;

        Ok(latest.map(|round| round.round_number).unwrap_or(0))
    }

    /// Stamp the end time, but only on a still-active round. Returns
    /// false when the round had already ended, which keeps duplicate
    /// end signals from re-running anything downstream.
    pub async fn finish_round(&self, round_id: Uuid) -> Result<bool> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let result = Rounds::update_many()
            .col_expr(rounds::Column::EndedAt, Expr::value(now))
            .filter(rounds::Column::Id.eq(round_id))
            .filter(rounds::Column::EndedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Insert a pending answer. The unique (round, player, category)
    /// index rejects duplicates; callers map that to a conflict.
    pub async fn insert_answer(
        &self,
        round_id: Uuid,
        player_id: Uuid,
        category: Category,
        word: &str,
    ) -> Result<Answer, sea_orm::DbErr> {
        let model = answers::ActiveModel {
            id: Set(Uuid::new_v4()),
            round_id: Set(round_id),
            player_id: Set(player_id),
            category: Set(category.as_str().to_string()),
            word: Set(word.to_string()),
            result: Set(AnswerStatus::Pending.as_str().to_string()),
        }
        .insert(&self.db)
        .await?;

        Ok(Answer {
            id: model.id,
            round_id: model.round_id,
            player_id: model.player_id,
            category,
            word: model.word,
            status: AnswerStatus::Pending,
        })
    }

    /// Record a validation verdict. Grading happens exactly once per
    /// answer in the happy path; this still refuses to overwrite a
    /// non-pending row so a racing duplicate grade cannot flip one.
    pub async fn grade_answer(&self, answer_id: Uuid, status: AnswerStatus) -> Result<bool> {
        let result = Answers::update_many()
            .col_expr(
                answers::Column::Result,
                Expr::value(status.as_str().to_string()),
            )
            .filter(answers::Column::Id.eq(answer_id))
            .filter(answers::Column::Result.eq(AnswerStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Policy at scoring time: anything still pending counts invalid.
    pub async fn mark_pending_invalid(&self, round_id: Uuid) -> Result<u64> {
        let result = Answers::update_many()
            .col_expr(
                answers::Column::Result,
                Expr::value(AnswerStatus::Invalid.as_str().to_string()),
            )
            .filter(answers::Column::RoundId.eq(round_id))
            .filter(answers::Column::Result.eq(AnswerStatus::Pending.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn answers_for_round(&self, round_id: Uuid) -> Result<Vec<Answer>> {
        let models = Answers::find()
            .filter(answers::Column::RoundId.eq(round_id))
            .all(&self.db)
            .await?;

        models.into_iter().map(Self::model_to_answer).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use crate::repositories::{is_unique_violation, RoomRepository};
    use migration::{Migrator, MigratorTrait};

    async fn setup() -> (RoundRepository, Uuid, Uuid) {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let rooms = RoomRepository::new(db.clone());
        let room = rooms.create_room("TEST", "أحمد").await.unwrap();
        let player = rooms.add_player(room.id, "أحمد", true).await.unwrap();

        (RoundRepository::new(db), room.id, player.id)
    }

    #[tokio::test]
    async fn test_round_lifecycle() {
        let (repo, room_id, _) = setup().await;

        assert!(repo.active_round(room_id).await.unwrap().is_none());
        assert_eq!(repo.max_round_number(room_id).await.unwrap(), 0);

        let round = repo.create_round(Uuid::new_v4(), room_id, 1, 'ق').await.unwrap();
        assert!(round.is_active());
        assert_eq!(round.letter, "ق");

        let active = repo.active_round(room_id).await.unwrap().unwrap();
        assert_eq!(active.id, round.id);
        assert_eq!(repo.max_round_number(room_id).await.unwrap(), 1);

        assert!(repo.finish_round(round.id).await.unwrap());
        // Second finish is a no-op at the storage layer too.
        assert!(!repo.finish_round(round.id).await.unwrap());

        let ended = repo.find_by_id(round.id).await.unwrap().unwrap();
        assert!(!ended.is_active());
        assert!(repo.active_round(room_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_answer_uniqueness_per_round_player_category() {
        let (repo, room_id, player_id) = setup().await;
        let round = repo.create_round(Uuid::new_v4(), room_id, 1, 'ق').await.unwrap();

        repo.insert_answer(round.id, player_id, Category::Animal, "قطة")
            .await
            .unwrap();
        let err = repo
            .insert_answer(round.id, player_id, Category::Animal, "قرد")
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        // Same player, different category is fine.
        repo.insert_answer(round.id, player_id, Category::Plant, "قرنفل")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_grading_happens_once() {
        let (repo, room_id, player_id) = setup().await;
        let round = repo.create_round(Uuid::new_v4(), room_id, 1, 'ق').await.unwrap();
        let answer = repo
            .insert_answer(round.id, player_id, Category::Animal, "قطة")
            .await
            .unwrap();

        assert!(repo.grade_answer(answer.id, AnswerStatus::Valid).await.unwrap());
        assert!(!repo
            .grade_answer(answer.id, AnswerStatus::Invalid)
            .await
            .unwrap());

        let answers = repo.answers_for_round(round.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].status, AnswerStatus::Valid);
    }

    #[tokio::test]
    async fn test_pending_answers_become_invalid() {
        let (repo, room_id, player_id) = setup().await;
        let round = repo.create_round(Uuid::new_v4(), room_id, 1, 'ق').await.unwrap();

        let graded = repo
            .insert_answer(round.id, player_id, Category::Animal, "قطة")
            .await
            .unwrap();
        repo.grade_answer(graded.id, AnswerStatus::Valid).await.unwrap();
        repo.insert_answer(round.id, player_id, Category::Plant, "قمح")
            .await
            .unwrap();

        let flipped = repo.mark_pending_invalid(round.id).await.unwrap();
        assert_eq!(flipped, 1);

        let answers = repo.answers_for_round(round.id).await.unwrap();
        let statuses: Vec<_> = answers.iter().map(|a| (a.category, a.status)).collect();
        assert!(statuses.contains(&(Category::Animal, AnswerStatus::Valid)));
        assert!(statuses.contains(&(Category::Plant, AnswerStatus::Invalid)));
    }
}
