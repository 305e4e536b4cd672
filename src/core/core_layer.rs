// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "location/location_service.rs"]
pub mod location;

#[path = "theme/theme_service.rs"]
pub mod theme;

#[path = "verification/mod.rs"]
pub mod verification;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "translation/translation_service.rs"]
pub mod translation;
