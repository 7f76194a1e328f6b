//! UseCase: ゲーム記録の CRUD
//!
//! ### どのような状況を想定しているか
//! - 正常系：作者ごとの一覧、取得、作成、部分更新、削除
//! - 異常系：authorId なしの一覧、必須項目が欠けた作成、存在しない ID

use std::sync::Arc;

use crate::domain::{Game, GameId, GamePatch, GameRepository, NewGame};

use super::error::GameError;

/// Unvalidated fields of a game to create. Empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub author_id: Option<String>,
    pub author_username: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl GameDraft {
    fn validate(self) -> Result<NewGame, GameError> {
        match (
            present(self.title),
            present(self.code),
            present(self.author_id),
            present(self.author_username),
        ) {
            (Some(title), Some(code), Some(author_id), Some(author_username)) => Ok(NewGame {
                title,
                description: self.description.unwrap_or_default(),
                code,
                author_id,
                author_username,
            }),
            _ => Err(GameError::MissingFields),
        }
    }
}

pub struct GameUseCase {
    repository: Arc<dyn GameRepository>,
}

impl GameUseCase {
    pub fn new(repository: Arc<dyn GameRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, author_id: Option<&str>) -> Result<Vec<Game>, GameError> {
        let author_id = author_id
            .filter(|id| !id.is_empty())
            .ok_or(GameError::MissingAuthor)?;
        Ok(self.repository.list_by_author(author_id).await?)
    }

    pub async fn get(&self, id: &GameId) -> Result<Game, GameError> {
        Ok(self.repository.get(id).await?)
    }

    pub async fn create(&self, draft: GameDraft) -> Result<Game, GameError> {
        let game = self.repository.create(draft.validate()?).await?;
        tracing::info!("Game '{}' created by '{}'", game.id, game.author_id);
        Ok(game)
    }

    pub async fn update(&self, id: &GameId, patch: GamePatch) -> Result<Game, GameError> {
        Ok(self.repository.update(id, patch).await?)
    }

    pub async fn delete(&self, id: &GameId) -> Result<(), GameError> {
        self.repository.delete(id).await?;
        tracing::info!("Game '{}' deleted", id);
        Ok(())
    }
}
