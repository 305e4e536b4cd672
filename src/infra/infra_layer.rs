// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "geo/geo_client.rs"]
pub mod geo;

#[path = "verification/mod.rs"]
pub mod verification;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "translation/translate_client.rs"]
pub mod translation;
