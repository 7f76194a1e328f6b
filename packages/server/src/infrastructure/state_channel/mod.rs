//! Shared State Channel の実装
//!
//! - `inmemory`: プロセス内の HashMap + broadcast チャンネル
//! - 将来的に: `redis` など、複数プロセスで共有する実装

pub mod inmemory;

pub use inmemory::InMemoryStateChannel;
