// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "moderation/commands.rs"]
pub mod moderation;

#[path = "ai/mod.rs"]
pub mod ai;

pub mod formatting;

// Re-export command types for convenience
pub use commands::classroom::{Data, Error};
