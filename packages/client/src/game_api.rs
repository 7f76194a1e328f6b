//! HTTP client for the game record API.

use gamejam_server::{
    domain::GamePatch,
    infrastructure::dto::http::{
        CreateGameRequest, DeleteResponse, ErrorResponse, GameDto, GameListResponse, GameResponse,
    },
};
use serde::de::DeserializeOwned;

use crate::error::GameApiError;

/// Client of `/api/games`.
///
/// # Example
///
/// ```ignore
/// let api = GameApiClient::new("http://127.0.0.1:8080/api");
/// let games = api.list_by_author("alice").await?;
/// ```
#[derive(Debug, Clone)]
pub struct GameApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GameApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn games_url(&self) -> String {
        format!("{}/games", self.base_url)
    }

    fn game_url(&self, id: &str) -> String {
        format!("{}/games/{}", self.base_url, id)
    }

    pub async fn list_by_author(&self, author_id: &str) -> Result<Vec<GameDto>, GameApiError> {
        let response = self
            .client
            .get(self.games_url())
            .query(&[("authorId", author_id)])
            .send()
            .await?;
        let body: GameListResponse = read_json(response).await?;
        Ok(body.games)
    }

    pub async fn get(&self, id: &str) -> Result<GameDto, GameApiError> {
        let response = self.client.get(self.game_url(id)).send().await?;
        let body: GameResponse = read_json(response).await?;
        Ok(body.game)
    }

    pub async fn create(&self, game: &CreateGameRequest) -> Result<GameDto, GameApiError> {
        let response = self.client.post(self.games_url()).json(game).send().await?;
        let body: GameResponse = read_json(response).await?;
        Ok(body.game)
    }

    pub async fn update(&self, id: &str, patch: &GamePatch) -> Result<GameDto, GameApiError> {
        let response = self
            .client
            .patch(self.game_url(id))
            .json(patch)
            .send()
            .await?;
        let body: GameResponse = read_json(response).await?;
        Ok(body.game)
    }

    pub async fn delete(&self, id: &str) -> Result<(), GameApiError> {
        let response = self.client.delete(self.game_url(id)).send().await?;
        let _: DeleteResponse = read_json(response).await?;
        Ok(())
    }
}

/// Decode a success body, or turn an `{error}` body into [`GameApiError::Api`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GameApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    };
    Err(GameApiError::Api {
        status: status.as_u16(),
        message,
    })
}
