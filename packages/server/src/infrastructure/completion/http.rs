//! HTTP completion endpoint client.
//!
//! POSTs `{messages, codeState}` and reads the response body as a raw text
//! stream. Chunk boundaries carry no meaning.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, future};
use serde::Deserialize;

use crate::domain::{CompletionError, CompletionProvider, CompletionRequest, TextStream};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpCompletionProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpCompletionProvider {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| CompletionError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, CompletionError> {
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(body) => body.error,
                Err(_) => format!("completion endpoint returned {}", status),
            };
            tracing::warn!("Completion endpoint rejected request ({}): {}", status, message);
            return Err(CompletionError::Transport(message));
        }

        tracing::debug!("Completion stream opened ({})", status);
        Ok(decode_text(response.bytes_stream()))
    }
}

/// Turn a byte stream into text chunks, holding back bytes of a UTF-8
/// sequence split across chunks until the rest arrives.
pub fn decode_text<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: fmt::Display + 'static,
{
    let mut decoder = Utf8Decoder::default();
    let text = bytes
        .map(move |chunk| match chunk {
            Ok(chunk) => Ok(decoder.push(chunk.as_ref())),
            Err(e) => Err(CompletionError::Stream(e.to_string())),
        })
        .filter(|item| future::ready(!matches!(item, Ok(text) if text.is_empty())));
    Box::pin(text)
}

#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::post};
    use futures_util::stream;

    use super::*;
    use crate::domain::{CompletionMessage, Role};

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![CompletionMessage {
                role: Role::User,
                content: "make pong".to_string(),
            }],
            code_state: None,
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/chat", addr)
    }

    async fn collect(stream: TextStream) -> Vec<Result<String, CompletionError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_decode_text_joins_split_utf8_sequence() {
        // テスト項目: チャンク境界で分割されたマルチバイト文字が正しく復元される
        // given (前提条件):
        let bytes = "ゲーム".as_bytes();
        let chunks = vec![
            Ok::<_, std::io::Error>(bytes[..2].to_vec()),
            Ok(bytes[2..7].to_vec()),
            Ok(bytes[7..].to_vec()),
        ];

        // when (操作):
        let text: Vec<String> = collect(decode_text(stream::iter(chunks)))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        // then (期待する結果):
        assert_eq!(text.concat(), "ゲーム");
    }

    #[tokio::test]
    async fn test_decode_text_maps_read_error_to_stream_error() {
        // テスト項目: 読み取りエラーは Stream エラーとして流れる
        // given (前提条件):
        let chunks = vec![
            Ok(b"partial".to_vec()),
            Err(std::io::Error::other("connection reset")),
        ];

        // when (操作):
        let items = collect(decode_text(stream::iter(chunks))).await;

        // then (期待する結果):
        assert_eq!(items[0], Ok("partial".to_string()));
        assert_eq!(
            items[1],
            Err(CompletionError::Stream("connection reset".to_string()))
        );
    }

    #[tokio::test]
    async fn test_stream_posts_request_and_reads_body() {
        // テスト項目: リクエストボディが送信され、レスポンス本文がテキストとして読める
        // given (前提条件):
        let app = Router::new().route(
            "/api/chat",
            post(|Json(body): Json<CompletionRequest>| async move {
                format!("echo: {}", body.messages[0].content)
            }),
        );
        let url = serve(app).await;
        let provider = HttpCompletionProvider::new(url, Duration::from_secs(5)).unwrap();

        // when (操作):
        let stream = provider.stream(request()).await.unwrap();
        let text: String = collect(stream)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        // then (期待する結果):
        assert_eq!(text, "echo: make pong");
    }

    #[tokio::test]
    async fn test_error_status_becomes_transport_error() {
        // テスト項目: 2xx 以外のレスポンスは {error} のメッセージで Transport エラーになる
        // given (前提条件):
        let app = Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "An error occurred during stream setup"})),
                )
            }),
        );
        let url = serve(app).await;
        let provider = HttpCompletionProvider::new(url, Duration::from_secs(5)).unwrap();

        // when (操作):
        let result = provider.stream(request()).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(CompletionError::Transport(message)) if message == "An error occurred during stream setup"
        ));
    }
}
