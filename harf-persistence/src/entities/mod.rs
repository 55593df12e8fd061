pub mod answers;
pub mod players;
pub mod rooms;
pub mod rounds;
pub mod scores;

pub mod prelude {
    pub use super::answers::Entity as Answers;
    pub use super::players::Entity as Players;
    pub use super::rooms::Entity as Rooms;
    pub use super::rounds::Entity as Rounds;
    pub use super::scores::Entity as Scores;
}
