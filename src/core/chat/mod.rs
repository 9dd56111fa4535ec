// Core chat module - classroom messages, validation and the message ledger.

pub mod chat_models;
pub mod chat_service;
pub mod validation;

pub use chat_models::*;
pub use chat_service::*;
pub use validation::*;
