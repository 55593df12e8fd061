use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rooms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rooms::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Rooms::Code).string().not_null())
                    .col(ColumnDef::new(Rooms::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Rooms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Join codes must stay unique among live rooms.
        manager
            .create_index(
                Index::create()
                    .name("idx_rooms_code_unique")
                    .table(Rooms::Table)
                    .col(Rooms::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Players::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Players::RoomId).uuid().not_null())
                    .col(ColumnDef::new(Players::Name).string().not_null())
                    .col(
                        ColumnDef::new(Players::IsHost)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Players::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_players_room")
                            .from(Players::Table, Players::RoomId)
                            .to(Rooms::Table, Rooms::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_players_room")
                    .table(Players::Table)
                    .col(Players::RoomId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rounds::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rounds::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Rounds::RoomId).uuid().not_null())
                    .col(ColumnDef::new(Rounds::RoundNumber).big_integer().not_null())
                    .col(ColumnDef::new(Rounds::Letter).string().not_null())
                    .col(
                        ColumnDef::new(Rounds::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Rounds::EndedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rounds_room")
                            .from(Rounds::Table, Rounds::RoomId)
                            .to(Rooms::Table, Rooms::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Active-round lookups filter on (room_id, ended_at IS NULL).
        manager
            .create_index(
                Index::create()
                    .name("idx_rounds_room")
                    .table(Rounds::Table)
                    .col(Rounds::RoomId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Answers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Answers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Answers::RoundId).uuid().not_null())
                    .col(ColumnDef::new(Answers::PlayerId).uuid().not_null())
                    .col(ColumnDef::new(Answers::Category).string().not_null())
                    .col(ColumnDef::new(Answers::Word).string().not_null())
                    .col(
                        ColumnDef::new(Answers::Result)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_answers_round")
                            .from(Answers::Table, Answers::RoundId)
                            .to(Rounds::Table, Rounds::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_answers_player")
                            .from(Answers::Table, Answers::PlayerId)
                            .to(Players::Table, Players::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one answer per (round, player, category).
        manager
            .create_index(
                Index::create()
                    .name("idx_answers_round_player_category_unique")
                    .table(Answers::Table)
                    .col(Answers::RoundId)
                    .col(Answers::PlayerId)
                    .col(Answers::Category)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Scores::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Scores::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Scores::RoomId).uuid().not_null())
                    .col(ColumnDef::new(Scores::PlayerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Scores::TotalPoints)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scores_room")
                            .from(Scores::Table, Scores::RoomId)
                            .to(Rooms::Table, Rooms::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scores_player")
                            .from(Scores::Table, Scores::PlayerId)
                            .to(Players::Table, Players::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One cumulative score row per player per room.
        manager
            .create_index(
                Index::create()
                    .name("idx_scores_room_player_unique")
                    .table(Scores::Table)
                    .col(Scores::RoomId)
                    .col(Scores::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Scores::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Answers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rounds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Players::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rooms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Rooms {
    Table,
    Id,
    Code,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Players {
    Table,
    Id,
    RoomId,
    Name,
    IsHost,
    JoinedAt,
}

#[derive(DeriveIden)]
enum Rounds {
    Table,
    Id,
    RoomId,
    RoundNumber,
    Letter,
    StartedAt,
    EndedAt,
}

#[derive(DeriveIden)]
enum Answers {
    Table,
    Id,
    RoundId,
    PlayerId,
    Category,
    Word,
    Result,
}

#[derive(DeriveIden)]
enum Scores {
    Table,
    Id,
    RoomId,
    PlayerId,
    TotalPoints,
}
