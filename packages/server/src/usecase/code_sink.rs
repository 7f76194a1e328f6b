//! UseCase: Code Reconciliation Sink
//!
//! Turns streamed, possibly unfinished code into editor content. Fence
//! markers never reach the editor, and the editor is read-only while code is
//! still arriving.
//!
//! "Running" code is what the renderer executes (the SyncedCode slot).
//! Promoting code writes it there and bumps the restart counter so every
//! renderer remounts with fresh state.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, watch};

use crate::domain::{SessionState, StateSlot, ViewMode, clean_fragment};

use super::{
    chat_session::{CodeConsumer, CodeUpdate},
    error::CodeSinkError,
};

/// What every participant's editor shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditorState {
    pub code: String,
    pub language: Option<String>,
    /// Code is still streaming in; edits are rejected
    pub is_receiving: bool,
    /// Editor content differs from the running code
    pub dirty: bool,
    pub view_mode: ViewMode,
}

struct Inner {
    editor: EditorState,
    running: String,
    /// Editor code and language from before the current stream started
    before_receiving: Option<(String, Option<String>)>,
}

impl Inner {
    fn refresh_dirty(&mut self) {
        self.editor.dirty = !self.editor.is_receiving && self.editor.code != self.running;
    }
}

pub struct CodeSink {
    state: SessionState,
    inner: Mutex<Inner>,
    published: watch::Sender<EditorState>,
}

impl CodeSink {
    pub fn new(state: SessionState) -> Self {
        let (published, _) = watch::channel(EditorState::default());
        Self {
            state,
            inner: Mutex::new(Inner {
                editor: EditorState::default(),
                running: String::new(),
                before_receiving: None,
            }),
            published,
        }
    }

    pub async fn editor_state(&self) -> EditorState {
        self.inner.lock().await.editor.clone()
    }

    /// Change feed of the editor. Every applied fragment, edit and mode
    /// switch is published here.
    pub fn subscribe(&self) -> watch::Receiver<EditorState> {
        self.published.subscribe()
    }

    pub async fn running_code(&self) -> String {
        self.inner.lock().await.running.clone()
    }

    /// Apply a streamed fragment and return the cleaned code.
    pub async fn apply(
        &self,
        raw: &str,
        language: Option<&str>,
        is_complete: bool,
    ) -> Result<String, CodeSinkError> {
        let cleaned = clean_fragment(raw, is_complete);

        let promote = {
            let mut inner = self.inner.lock().await;
            if is_complete {
                inner.before_receiving = None;
            } else if !inner.editor.is_receiving {
                inner.before_receiving =
                    Some((inner.editor.code.clone(), inner.editor.language.clone()));
            }
            inner.editor.code = cleaned.clone();
            if let Some(language) = language {
                inner.editor.language = Some(language.to_string());
            }
            inner.editor.is_receiving = !is_complete;
            let promote = is_complete && inner.editor.view_mode == ViewMode::Play;
            if promote {
                inner.running = cleaned.clone();
            }
            inner.refresh_dirty();
            self.published.send_replace(inner.editor.clone());
            promote
        };

        if promote {
            self.promote(&cleaned).await?;
        }
        Ok(cleaned)
    }

    /// Leave receiving mode without new code, putting back what the editor
    /// showed before the stream.
    pub async fn abandon(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.editor.is_receiving {
            return;
        }
        if let Some((code, language)) = inner.before_receiving.take() {
            inner.editor.code = code;
            inner.editor.language = language;
        }
        inner.editor.is_receiving = false;
        inner.refresh_dirty();
        self.published.send_replace(inner.editor.clone());
    }

    /// Start from `code` without restarting any renderer.
    pub async fn seed(&self, code: &str) -> Result<(), CodeSinkError> {
        {
            let mut inner = self.inner.lock().await;
            inner.editor.code = code.to_string();
            inner.running = code.to_string();
            inner.refresh_dirty();
            self.published.send_replace(inner.editor.clone());
        }
        self.state.write(StateSlot::SyncedCode, &code).await?;
        Ok(())
    }

    /// User edit in the editor.
    pub async fn edit(&self, code: &str) -> Result<(), CodeSinkError> {
        let mut inner = self.inner.lock().await;
        if inner.editor.is_receiving {
            return Err(CodeSinkError::ReadOnly);
        }
        inner.editor.code = code.to_string();
        inner.refresh_dirty();
        self.published.send_replace(inner.editor.clone());
        Ok(())
    }

    /// Run the editor's content.
    pub async fn apply_edited_code(&self) -> Result<String, CodeSinkError> {
        let code = {
            let mut inner = self.inner.lock().await;
            if inner.editor.is_receiving {
                return Err(CodeSinkError::ReadOnly);
            }
            inner.running = inner.editor.code.clone();
            inner.refresh_dirty();
            self.published.send_replace(inner.editor.clone());
            inner.running.clone()
        };
        self.promote(&code).await?;
        Ok(code)
    }

    /// Replace both editor and running code, e.g. when opening a saved game.
    pub async fn load_code(&self, code: &str) -> Result<(), CodeSinkError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.editor.is_receiving {
                return Err(CodeSinkError::ReadOnly);
            }
            inner.editor.code = code.to_string();
            inner.running = code.to_string();
            inner.refresh_dirty();
            self.published.send_replace(inner.editor.clone());
        }
        self.promote(code).await
    }

    /// Switch between play and edit. Leaving edit mode with unapplied edits
    /// runs them.
    pub async fn set_view_mode(&self, mode: ViewMode) -> Result<(), CodeSinkError> {
        let apply_edits = {
            let mut inner = self.inner.lock().await;
            if inner.editor.is_receiving && mode == ViewMode::Play {
                return Err(CodeSinkError::ReadOnly);
            }
            let apply_edits = inner.editor.view_mode == ViewMode::Edit
                && mode == ViewMode::Play
                && inner.editor.dirty;
            inner.editor.view_mode = mode;
            self.published.send_replace(inner.editor.clone());
            apply_edits
        };
        if apply_edits {
            self.apply_edited_code().await?;
        }
        Ok(())
    }

    async fn promote(&self, code: &str) -> Result<(), CodeSinkError> {
        self.state.write(StateSlot::SyncedCode, &code).await?;
        let restarts = self
            .state
            .modify(StateSlot::RestartCounter, |counter: &mut u64| {
                *counter += 1;
                *counter
            })
            .await?;
        tracing::debug!(
            "Promoted code for session '{}' (restart #{})",
            self.state.session_id(),
            restarts
        );
        Ok(())
    }
}

#[async_trait]
impl CodeConsumer for CodeSink {
    async fn on_code(&self, update: CodeUpdate) {
        if let Err(e) = self
            .apply(&update.fragment, update.language.as_deref(), update.is_complete)
            .await
        {
            tracing::error!("Failed to apply streamed code: {}", e);
        }
    }

    async fn release(&self) {
        self.abandon().await;
    }

    async fn current_code(&self) -> Option<String> {
        let running = self.running_code().await;
        (!running.trim().is_empty()).then_some(running)
    }
}
