//! InMemory Game Repository 実装
//!
//! ドメイン層が定義する GameRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。プロセス終了とともに消えます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Game, GameId, GamePatch, GameRepository, NewGame, RepositoryError, Timestamp};
use gamejam_shared::time::{Clock, SystemClock};

/// インメモリ Game Repository 実装
pub struct InMemoryGameRepository {
    games: Mutex<HashMap<GameId, Game>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

impl Default for InMemoryGameRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Game>, RepositoryError> {
        let games = self.games.lock().await;
        let mut listed: Vec<Game> = games
            .values()
            .filter(|game| game.author_id == author_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.updated_at.value().cmp(&a.updated_at.value()));
        Ok(listed)
    }

    async fn get(&self, id: &GameId) -> Result<Game, RepositoryError> {
        let games = self.games.lock().await;
        games
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::GameNotFound(id.to_string()))
    }

    async fn create(&self, game: NewGame) -> Result<Game, RepositoryError> {
        let now = self.now();
        let game = Game {
            id: GameId::generate(),
            title: game.title,
            description: game.description,
            code: game.code,
            author_id: game.author_id,
            author_username: game.author_username,
            created_at: now,
            updated_at: now,
        };

        let mut games = self.games.lock().await;
        games.insert(game.id.clone(), game.clone());
        tracing::debug!("Game '{}' created by '{}'", game.id, game.author_id);
        Ok(game)
    }

    async fn update(&self, id: &GameId, patch: GamePatch) -> Result<Game, RepositoryError> {
        let now = self.now();
        let mut games = self.games.lock().await;
        let game = games
            .get_mut(id)
            .ok_or_else(|| RepositoryError::GameNotFound(id.to_string()))?;
        patch.apply_to(game, now);
        tracing::debug!("Game '{}' updated", id);
        Ok(game.clone())
    }

    async fn delete(&self, id: &GameId) -> Result<(), RepositoryError> {
        let mut games = self.games.lock().await;
        games
            .remove(id)
            .map(|_| tracing::debug!("Game '{}' deleted", id))
            .ok_or_else(|| RepositoryError::GameNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    /// Clock that advances one second per reading.
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn now_millis(&self) -> i64 {
            self.0.fetch_add(1000, Ordering::SeqCst)
        }
    }

    fn new_game(title: &str, author_id: &str) -> NewGame {
        NewGame {
            title: title.to_string(),
            description: String::new(),
            code: "return function(p) {}".to_string(),
            author_id: author_id.to_string(),
            author_username: author_id.to_string(),
        }
    }

    fn repository() -> InMemoryGameRepository {
        InMemoryGameRepository::with_clock(Arc::new(TickingClock(AtomicI64::new(1_000))))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        // テスト項目: 作成したゲームを ID で取得できる
        // given (前提条件):
        let repository = repository();

        // when (操作):
        let created = repository.create(new_game("Pong", "alice")).await.unwrap();
        let fetched = repository.get(&created.id).await.unwrap();

        // then (期待する結果):
        assert_eq!(created, fetched);
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn test_list_by_author_sorted_by_updated_at_desc() {
        // テスト項目: 作者ごとの一覧が更新日時の降順で返され、他の作者のゲームは含まれない
        // given (前提条件):
        let repository = repository();
        let first = repository.create(new_game("First", "alice")).await.unwrap();
        repository.create(new_game("Second", "alice")).await.unwrap();
        repository.create(new_game("Other", "bob")).await.unwrap();

        // when (操作):
        repository
            .update(
                &first.id,
                GamePatch {
                    title: Some("First v2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let listed = repository.list_by_author("alice").await.unwrap();

        // then (期待する結果):
        let titles: Vec<&str> = listed.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["First v2", "Second"]);
    }

    #[tokio::test]
    async fn test_update_keeps_untouched_fields() {
        // テスト項目: 部分更新では指定したフィールドのみ変更され、updated_at が進む
        // given (前提条件):
        let repository = repository();
        let created = repository.create(new_game("Pong", "alice")).await.unwrap();

        // when (操作):
        let updated = repository
            .update(
                &created.id,
                GamePatch {
                    code: Some("return function(p) { p.noLoop(); }".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(updated.title, "Pong");
        assert_eq!(updated.code, "return function(p) { p.noLoop(); }");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.value() > created.updated_at.value());
    }

    #[tokio::test]
    async fn test_unknown_game_is_not_found() {
        // テスト項目: 存在しない ID への操作は GameNotFound を返す
        // given (前提条件):
        let repository = repository();
        let unknown = GameId::generate();

        // when (操作):
        let get = repository.get(&unknown).await;
        let update = repository.update(&unknown, GamePatch::default()).await;
        let delete = repository.delete(&unknown).await;

        // then (期待する結果):
        for result in [get.map(|_| ()), update.map(|_| ()), delete] {
            assert!(matches!(result, Err(RepositoryError::GameNotFound(_))));
        }
    }

    #[tokio::test]
    async fn test_delete_removes_game() {
        // テスト項目: 削除したゲームは取得できなくなる
        // given (前提条件):
        let repository = repository();
        let created = repository.create(new_game("Pong", "alice")).await.unwrap();

        // when (操作):
        repository.delete(&created.id).await.unwrap();

        // then (期待する結果):
        assert!(repository.get(&created.id).await.is_err());
        assert!(repository.list_by_author("alice").await.unwrap().is_empty());
    }
}
