//! Repository trait 定義
//!
//! Persistence of finished games. The concrete store lives in the
//! infrastructure layer (依存性の逆転).

use async_trait::async_trait;

use super::{
    entity::{Game, GamePatch, NewGame},
    error::RepositoryError,
    value_object::GameId,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Games of one author, most recently updated first
    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Game>, RepositoryError>;

    async fn get(&self, id: &GameId) -> Result<Game, RepositoryError>;

    async fn create(&self, game: NewGame) -> Result<Game, RepositoryError>;

    async fn update(&self, id: &GameId, patch: GamePatch) -> Result<Game, RepositoryError>;

    async fn delete(&self, id: &GameId) -> Result<(), RepositoryError>;
}
