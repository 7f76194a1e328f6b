//! Terminal participant for the collaborative game-jam server.

mod command;
mod domain;
pub mod error;
mod formatter;
pub mod game_api;
mod runner;
mod session;
mod ui;

pub use error::{ClientError, GameApiError};
pub use game_api::GameApiClient;
pub use runner::run_client;
pub use session::SessionConfig;
