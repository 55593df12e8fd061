pub mod room_repository;
pub mod round_repository;
pub mod score_repository;

pub use room_repository::RoomRepository;
pub use round_repository::RoundRepository;
pub use score_repository::ScoreRepository;

/// Insert-or-fail constraint handling: join codes and the
/// (round, player, category) answer key rely on unique indexes.
pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}
