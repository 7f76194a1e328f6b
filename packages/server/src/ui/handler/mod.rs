//! Request handlers.

mod chat;
mod games;
mod http;
mod websocket;

pub use chat::chat_completion;
pub use games::{create_game, delete_game, get_game, list_games, update_game};
pub use http::{get_session, get_sketch, health_check, method_not_allowed};
pub use websocket::websocket_handler;
