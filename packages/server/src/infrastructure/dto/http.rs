//! HTTP API DTOs.
//!
//! Game records keep the snake_case field names of the persisted rows, and
//! timestamps are rendered as RFC 3339.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::websocket::EditorInfo;
use crate::domain::{Game, GamePatch};
use gamejam_shared::time::timestamp_to_rfc3339;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub code: String,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Game> for GameDto {
    fn from(game: Game) -> Self {
        Self {
            id: game.id.into_string(),
            title: game.title,
            description: game.description,
            code: game.code,
            author_id: game.author_id,
            author_username: game.author_username,
            created_at: timestamp_to_rfc3339(game.created_at.value()),
            updated_at: timestamp_to_rfc3339(game.updated_at.value()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameListResponse {
    pub games: Vec<GameDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResponse {
    pub game: GameDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body of `POST /api/games`. Every field is optional on the wire so that a
/// missing one is reported as 400 rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_username: Option<String>,
}

/// Body of `PATCH /api/games/{id}`.
pub type UpdateGameRequest = GamePatch;

#[derive(Debug, Clone, Deserialize)]
pub struct GameListQuery {
    #[serde(rename = "authorId")]
    pub author_id: Option<String>,
}

/// Body of `GET /api/sessions/{id}`: every slot keyed by its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub state: Map<String, Value>,
    pub editor: EditorInfo,
}

/// Body of `GET /api/sessions/{id}/sketch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchResponse {
    pub code: String,
    pub repairs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GameId, Timestamp};

    #[test]
    fn test_game_dto_renders_rfc3339_timestamps() {
        // テスト項目: Game から DTO への変換でタイムスタンプが RFC 3339 になる
        // given (前提条件):
        let game = Game {
            id: GameId::new("g1".to_string()).unwrap(),
            title: "Pong".to_string(),
            description: String::new(),
            code: "return function(p) {}".to_string(),
            author_id: "alice".to_string(),
            author_username: "Alice".to_string(),
            created_at: Timestamp::new(0),
            updated_at: Timestamp::new(1_000),
        };

        // when (操作):
        let dto = GameDto::from(game);

        // then (期待する結果):
        assert_eq!(dto.id, "g1");
        assert_eq!(dto.created_at, "1970-01-01T00:00:00+00:00");
        assert_eq!(dto.updated_at, "1970-01-01T00:00:01+00:00");
    }
}
