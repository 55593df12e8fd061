pub mod connection;
pub mod entities;
pub mod repositories;

pub use repositories::{RoomRepository, RoundRepository, ScoreRepository, is_unique_violation};
