//! Domain layer: entities, value objects, the pure code-handling functions
//! and the traits the outer layers implement.

pub mod code;
pub mod completion;
pub mod entity;
pub mod error;
pub mod example_game;
pub mod pusher;
pub mod repair;
pub mod repository;
pub mod session_state;
pub mod state_channel;
pub mod value_object;

pub use code::{
    CODE_PLACEHOLDER, Extraction, SKETCH_WRAPPER, WRITING_CODE_PLACEHOLDER, clean_fragment,
    collapse_nested_wrapper, extract_code, fence_language, is_code_block_complete,
};
pub use completion::{CompletionMessage, CompletionProvider, CompletionRequest, TextStream};
pub use entity::{
    ActivePlayer, ChatMessage, CodeArtifact, Game, GamePatch, NewGame, Participant,
    PendingMessage, Role, TypingParticipant, ViewMode,
};
pub use error::{
    CompletionError, MessagePushError, RepositoryError, StateChannelError, UnknownExample,
    ValueObjectError,
};
pub use example_game::ExampleGame;
pub use pusher::{ConnectionKey, MessagePusher, PusherChannel};
pub use repair::{
    ERROR_SKETCH, PreparedSketch, RepairAction, RepairedCode, Unrepairable, prepare_sketch,
    repair,
};
pub use repository::GameRepository;
pub use session_state::SessionState;
pub use state_channel::{
    SharedStateChannel, StateChange, StateKey, StateSlot, StateSubscription, Updater,
};
pub use value_object::{ArtifactId, GameId, MessageId, SessionId, Timestamp, UserId};

#[cfg(test)]
pub use pusher::MockMessagePusher;
#[cfg(test)]
pub use repository::MockGameRepository;
