//! Game record CRUD endpoint handlers.
//!
//! Every failure is answered with `{error}` and a conventional status code.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};

use crate::{
    domain::GameId,
    infrastructure::dto::http::{
        CreateGameRequest, DeleteResponse, GameListQuery, GameListResponse, GameResponse,
        UpdateGameRequest,
    },
    ui::state::AppState,
    usecase::{GameDraft, GameError},
};

use super::http::error_response;

fn game_error(error: GameError) -> Response {
    match error {
        GameError::MissingAuthor | GameError::MissingFields => {
            error_response(StatusCode::BAD_REQUEST, error.to_string())
        }
        GameError::NotFound => error_response(StatusCode::NOT_FOUND, error.to_string()),
        GameError::Repository(e) => {
            tracing::error!("Game store failure: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred during the request",
            )
        }
    }
}

fn bad_body(rejection: JsonRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

/// Unknown or malformed ids are reported as not found
fn parse_game_id(raw: String) -> Result<GameId, Response> {
    GameId::new(raw).map_err(|_| game_error(GameError::NotFound))
}

/// `GET /api/games?authorId=`
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GameListQuery>,
) -> Result<Json<GameListResponse>, Response> {
    let games = state
        .game_usecase
        .list(query.author_id.as_deref())
        .await
        .map_err(game_error)?;
    Ok(Json(GameListResponse {
        games: games.into_iter().map(Into::into).collect(),
    }))
}

/// `POST /api/games`
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<Json<GameResponse>, Response> {
    let Json(request) = body.map_err(bad_body)?;
    let draft = GameDraft {
        title: request.title,
        description: request.description,
        code: request.code,
        author_id: request.author_id,
        author_username: request.author_username,
    };
    let game = state.game_usecase.create(draft).await.map_err(game_error)?;
    Ok(Json(GameResponse { game: game.into() }))
}

/// `GET /api/games/{id}`
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GameResponse>, Response> {
    let id = parse_game_id(id)?;
    let game = state.game_usecase.get(&id).await.map_err(game_error)?;
    Ok(Json(GameResponse { game: game.into() }))
}

/// `PATCH /api/games/{id}`
pub async fn update_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateGameRequest>, JsonRejection>,
) -> Result<Json<GameResponse>, Response> {
    let id = parse_game_id(id)?;
    let Json(patch) = body.map_err(bad_body)?;
    let game = state
        .game_usecase
        .update(&id, patch)
        .await
        .map_err(game_error)?;
    Ok(Json(GameResponse { game: game.into() }))
}

/// `DELETE /api/games/{id}`
pub async fn delete_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, Response> {
    let id = parse_game_id(id)?;
    state.game_usecase.delete(&id).await.map_err(game_error)?;
    Ok(Json(DeleteResponse { success: true }))
}
