//! Collaborative game-jam server.
//!
//! Participants of a session chat with an LLM together: their prompts are
//! batched while anyone is still typing, the reply is streamed into a shared
//! transcript, and the generated p5.js code is kept in sync across clients.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
