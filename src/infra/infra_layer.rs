// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

pub mod database;

pub mod memory;

#[path = "chat/mod.rs"]
pub mod chat;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "usage/mod.rs"]
pub mod usage;

#[path = "ai/mod.rs"]
pub mod ai;
