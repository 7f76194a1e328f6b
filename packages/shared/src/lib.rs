//! Utilities shared by the game-jam server and client.

pub mod logger;
pub mod time;
