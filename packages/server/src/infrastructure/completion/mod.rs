//! CompletionProvider の実装
//!
//! - `http`: 外部の completion エンドポイント（`{messages, codeState}` → テキストストリーム）
//! - `anthropic`: Anthropic Messages API を直接呼び出す実装
//! - `prompt`: ゲーム開発アシスタントの system prompt

pub mod anthropic;
pub mod http;
pub mod prompt;

pub use anthropic::AnthropicProvider;
pub use http::HttpCompletionProvider;
