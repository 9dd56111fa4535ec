// Core moderation module - content filter, banned terms and re-moderation.

pub mod banned_terms;
pub mod content_filter;
pub mod moderation_models;
pub mod moderation_service;

pub use banned_terms::{BannedTermService, BannedTermStore};
pub use content_filter::classify;
pub use moderation_models::*;
pub use moderation_service::*;
