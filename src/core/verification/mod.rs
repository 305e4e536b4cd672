// Core verification module - one-time-code issuance, routing and checking.
// Following the same pattern as the moderation module.

pub mod verification_models;
pub mod verification_service;

pub use verification_models::*;
pub use verification_service::*;
