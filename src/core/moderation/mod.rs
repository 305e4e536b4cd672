// Core moderation module - comment validation, cleaning and the dislike
// auto-deletion rule.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
