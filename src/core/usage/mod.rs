// Core usage module - accounting for generative-text calls.

pub mod usage_models;
pub mod usage_service;

pub use usage_models::*;
pub use usage_service::*;
