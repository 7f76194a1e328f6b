//! UseCase layer: the session runtime and the operations the UI layer calls.

pub mod batch_coordinator;
pub mod chat_session;
pub mod coalescer;
pub mod code_sink;
pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod game_session;
pub mod games;
pub mod session_registry;

pub use batch_coordinator::BatchCoordinator;
pub use chat_session::{
    ChatSession, ChatSessionConfig, CodeConsumer, CodeUpdate, DEFAULT_REQUEST_TIMEOUT,
    EMPTY_STREAM_NOTICE, StreamOutcome, TRANSPORT_ERROR_NOTICE, merge_batch_prompt,
};
pub use coalescer::Coalescer;
pub use code_sink::{CodeSink, EditorState};
pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{BatchError, ChatError, CodeSinkError, ConnectError, GameError, SessionError};
pub use game_session::{Dispatch, GameSession};
pub use games::{GameDraft, GameUseCase};
pub use session_registry::{OnCreated, SessionRegistry};
