//! Command handlers for the kbchat CLI.

pub mod ask;
pub mod chat;
pub mod clean;
pub mod ingest;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use clean::CleanCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;
