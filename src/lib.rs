//! Decision core of the Clipstream video-sharing platform.
//!
//! **Architecture Overview:**
//! - `core/` = Business logic (transport-agnostic policies and their ports)
//! - `infra/` = Implementations of core traits (stores, provider clients)
//!
//! The crate owns no HTTP routes and no database schema. Route handlers call
//! into the core services and inject whichever store/provider adapters fit
//! the deployment: the in-memory stores for a single process, the SQLite
//! comment store for durability, or an application-provided implementation
//! of the same traits for anything else.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;
