//! Game-jam server: HTTP routes, WebSocket sessions and per-session fan-out.

mod fanout;
mod handler;
mod server;
mod signal;
pub mod state;

pub use fanout::spawn_fanout;
pub use server::{Server, build_router};
pub use state::AppState;
