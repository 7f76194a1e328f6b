//! UseCase: Chat/Completion Session
//!
//! 1 件のメッセージ（またはマージしたバッチ）を 1 回の completion リクエストにし、
//! 応答を 1 つのアシスタントメッセージへストリーミングする。
//!
//! ### どのような状況を想定しているか
//! - 正常系：応答が最後まで届き、コードが抽出されればアーティファクトが作られる
//! - 異常系：接続エラー、ストリーム途中のエラー、タイムアウト
//! - エッジケース：空のストリーム
//!
//! どの終了経路でも StreamingState は必ず空に戻る。

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::{
    sync::watch,
    time::{Instant, sleep_until, timeout_at},
};

use crate::domain::{
    ArtifactId, ChatMessage, CodeArtifact, CompletionError, CompletionMessage, CompletionProvider,
    CompletionRequest, Extraction, MessageId, Participant, PendingMessage, Role, SessionState,
    StateSlot, collapse_nested_wrapper, extract_code, fence_language, is_code_block_complete,
};

use super::{coalescer::Coalescer, error::ChatError};

pub const EMPTY_STREAM_NOTICE: &str = "Stream ended unexpectedly";
pub const TRANSPORT_ERROR_NOTICE: &str =
    "Sorry, there was an error processing your request. Please try again.";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const BATCH_PREAMBLE: &str =
    "Everyone is contributing ideas to this game. Please consider all these inputs together:";
const BATCH_CLOSING: &str =
    "Please combine these ideas in a creative way to make the best possible game!";

/// Outbound prompt for a batch. A single message is sent as-is.
pub fn merge_batch_prompt(batch: &[PendingMessage]) -> String {
    if let [only] = batch {
        return only.text.clone();
    }
    let entries = batch
        .iter()
        .map(|m| format!("{}: {}", m.display_name, m.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n\n{}\n\n{}", BATCH_PREAMBLE, entries, BATCH_CLOSING)
}

/// A change of the code being streamed for the current response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUpdate {
    /// Extracted code, or the raw text of a still-open block (fence included)
    pub fragment: String,
    pub language: Option<String>,
    pub is_complete: bool,
}

/// Receiver of streamed code, typically the editor sink.
#[async_trait]
pub trait CodeConsumer: Send + Sync {
    async fn on_code(&self, update: CodeUpdate);

    /// The still-open block last forwarded turned out not to be script code.
    async fn release(&self);

    /// Code the model should see as context
    async fn current_code(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatSessionConfig {
    /// Wall-clock bound from dispatch to the last chunk
    pub request_timeout: Duration,
    /// Minimum spacing of transcript updates while streaming
    pub publish_interval: Duration,
}

impl Default for ChatSessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            publish_interval: Duration::ZERO,
        }
    }
}

/// How a response stream ended. Transport failures are returned as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    EmptyStream,
    Interrupted(String),
    TimedOut,
}

enum StreamEnd {
    Finished,
    Interrupted(String),
    TimedOut,
}

/// Text received so far for one response and what has been forwarded.
#[derive(Default)]
struct ReplyBuffer {
    text: String,
    /// Last closed code block seen
    extracted: Option<String>,
    forwarded: Option<CodeUpdate>,
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ChatSession {
    state: SessionState,
    provider: Arc<dyn CompletionProvider>,
    consumer: Arc<dyn CodeConsumer>,
    config: ChatSessionConfig,
    is_loading: AtomicBool,
    last_error: watch::Sender<Option<String>>,
}

impl ChatSession {
    pub fn new(
        state: SessionState,
        provider: Arc<dyn CompletionProvider>,
        consumer: Arc<dyn CodeConsumer>,
        config: ChatSessionConfig,
    ) -> Self {
        let (last_error, _) = watch::channel(None);
        Self {
            state,
            provider,
            consumer,
            config,
            is_loading: AtomicBool::new(false),
            last_error,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    /// Message of the last transport failure, cleared by the next send.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub async fn send(
        &self,
        text: &str,
        sender: Option<Participant>,
    ) -> Result<StreamOutcome, ChatError> {
        self.send_batch(text, sender, &[]).await
    }

    /// Send `text` as one request. With more than one `batch` entry the
    /// transcript gets one attributed message per contributor instead of `text`.
    pub async fn send_batch(
        &self,
        text: &str,
        primary_sender: Option<Participant>,
        batch: &[PendingMessage],
    ) -> Result<StreamOutcome, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self
            .is_loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        let _loading = LoadingGuard(&self.is_loading);

        if self.state.streaming_message().await?.is_some() {
            return Err(ChatError::Busy);
        }
        self.last_error.send_replace(None);

        let reply_id = MessageId::generate();
        let mut entries: Vec<ChatMessage> = if batch.len() > 1 {
            batch.iter().map(ChatMessage::batched).collect()
        } else {
            vec![ChatMessage::user(text, primary_sender)]
        };
        entries.push(ChatMessage::assistant_placeholder(reply_id.clone()));

        let mut messages = self
            .state
            .modify(StateSlot::ChatHistory, |history: &mut Vec<ChatMessage>| {
                let prior: Vec<CompletionMessage> = history
                    .iter()
                    .map(|m| CompletionMessage {
                        role: m.role,
                        content: m.content.clone(),
                    })
                    .collect();
                history.extend(entries);
                prior
            })
            .await?;
        self.state.set_streaming_message(Some(&reply_id)).await?;

        messages.push(CompletionMessage {
            role: Role::User,
            content: text.to_string(),
        });
        let request = CompletionRequest {
            messages,
            code_state: self.consumer.current_code().await,
        };

        tracing::info!(
            "Sending completion request for session '{}' ({} contributors)",
            self.state.session_id(),
            batch.len().max(1)
        );
        let result = self.stream_reply(&reply_id, request).await;

        if let Err(e) = self.state.set_streaming_message(None).await {
            tracing::error!("Failed to clear streaming state: {}", e);
            if result.is_ok() {
                return Err(e.into());
            }
        }
        result
    }

    async fn stream_reply(
        &self,
        reply_id: &MessageId,
        request: CompletionRequest,
    ) -> Result<StreamOutcome, ChatError> {
        let deadline = Instant::now() + self.config.request_timeout;

        let mut stream = match timeout_at(deadline, self.provider.stream(request)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return self.fail(reply_id, e).await,
            Err(_) => {
                let e = CompletionError::Transport(format!(
                    "no response within {}s",
                    self.config.request_timeout.as_secs()
                ));
                return self.fail(reply_id, e).await;
            }
        };

        let mut reply = ReplyBuffer::default();
        let mut coalescer = Coalescer::new(self.config.publish_interval);
        let mut display = String::new();

        let end = loop {
            let flush_at = coalescer.deadline();
            tokio::select! {
                next = timeout_at(deadline, stream.next()) => match next {
                    Ok(Some(Ok(chunk))) => {
                        reply.text.push_str(&chunk);
                        let extraction = extract_code(&reply.text);
                        self.forward_code(&mut reply, &extraction, false).await;
                        display = extraction.display;
                        if coalescer.offer(Instant::now()) {
                            self.publish(reply_id, display.clone(), None).await?;
                            coalescer.flushed(Instant::now());
                        }
                    }
                    Ok(Some(Err(e))) => break StreamEnd::Interrupted(e.to_string()),
                    Ok(None) => break StreamEnd::Finished,
                    Err(_) => break StreamEnd::TimedOut,
                },
                _ = sleep_until(flush_at.unwrap_or(deadline)), if flush_at.is_some() => {
                    self.publish(reply_id, display.clone(), None).await?;
                    coalescer.flushed(Instant::now());
                }
            }
        };

        let outcome = match end {
            StreamEnd::Finished if reply.text.trim().is_empty() => {
                tracing::warn!("Completion stream for '{}' ended empty", reply_id);
                self.publish(reply_id, EMPTY_STREAM_NOTICE.to_string(), Some(false))
                    .await?;
                return Ok(StreamOutcome::EmptyStream);
            }
            StreamEnd::Finished => {
                let extraction = extract_code(&reply.text);
                self.forward_code(&mut reply, &extraction, true).await;
                self.publish(reply_id, extraction.display, Some(true)).await?;
                StreamOutcome::Completed
            }
            StreamEnd::Interrupted(reason) => {
                tracing::warn!("Completion stream for '{}' interrupted: {}", reply_id, reason);
                self.finish_code(&mut reply).await;
                self.publish(reply_id, format!("Stream interrupted: {}", reason), Some(true))
                    .await?;
                StreamOutcome::Interrupted(reason)
            }
            StreamEnd::TimedOut => {
                tracing::warn!("Completion stream for '{}' timed out", reply_id);
                self.finish_code(&mut reply).await;
                let notice = format!(
                    "Stream interrupted: no response within {}s",
                    self.config.request_timeout.as_secs()
                );
                self.publish(reply_id, notice, Some(true)).await?;
                StreamOutcome::TimedOut
            }
        };

        if let Some(code) = reply.extracted.take() {
            self.create_artifact(code).await?;
        }
        Ok(outcome)
    }

    /// Forward the response's code to the consumer if it changed.
    async fn forward_code(&self, reply: &mut ReplyBuffer, extraction: &Extraction, finished: bool) {
        let update = if let Some(code) = &extraction.code {
            reply.extracted = Some(code.clone());
            CodeUpdate {
                fragment: collapse_nested_wrapper(code),
                language: extraction.language.clone(),
                is_complete: finished || is_code_block_complete(&reply.text),
            }
        } else if let Some(partial) = &extraction.partial {
            CodeUpdate {
                fragment: partial.clone(),
                language: fence_language(partial),
                is_complete: finished,
            }
        } else {
            if reply.forwarded.take_if(|last| !last.is_complete).is_some() {
                self.consumer.release().await;
            }
            return;
        };

        // A later fence elsewhere in the reply must not re-open finished code.
        let unchanged = reply.forwarded.as_ref().is_some_and(|last| {
            last == &update || (last.is_complete && last.fragment == update.fragment)
        });
        if !unchanged {
            self.consumer.on_code(update.clone()).await;
            reply.forwarded = Some(update);
        }
    }

    /// Mark whatever code was forwarded as final so the editor unlocks.
    async fn finish_code(&self, reply: &mut ReplyBuffer) {
        if let Some(last) = reply.forwarded.as_mut().filter(|u| !u.is_complete) {
            last.is_complete = true;
            self.consumer.on_code(last.clone()).await;
        }
    }

    async fn fail(
        &self,
        reply_id: &MessageId,
        error: CompletionError,
    ) -> Result<StreamOutcome, ChatError> {
        tracing::error!("Completion request failed: {}", error);
        self.last_error.send_replace(Some(error.to_string()));
        self.publish(reply_id, TRANSPORT_ERROR_NOTICE.to_string(), Some(true))
            .await?;
        Err(error.into())
    }

    /// Replace the reply's content, optionally setting `complete`.
    async fn publish(
        &self,
        reply_id: &MessageId,
        content: String,
        complete: Option<bool>,
    ) -> Result<(), ChatError> {
        self.state
            .modify(StateSlot::ChatHistory, |history: &mut Vec<ChatMessage>| {
                if let Some(message) = history.iter_mut().find(|m| &m.id == reply_id) {
                    message.content = content;
                    if complete.is_some() {
                        message.complete = complete;
                    }
                }
            })
            .await?;
        Ok(())
    }

    async fn create_artifact(&self, code: String) -> Result<(), ChatError> {
        let artifact = CodeArtifact {
            id: ArtifactId::generate(),
            code,
        };
        let id = artifact.id.clone();
        self.state
            .modify(
                StateSlot::CodeArtifacts,
                |artifacts: &mut Vec<CodeArtifact>| artifacts.push(artifact),
            )
            .await?;
        self.state
            .write(StateSlot::ActiveArtifact, &Some(id.clone()))
            .await?;
        tracing::info!("Code artifact '{}' created", id);
        Ok(())
    }
}
