//! Server-side self-view core.
//!
//! - `state`: live per-player hidden-slot masks
//! - `persist`: debounced durable storage of masks + config
//! - `invalidate`: per-player throttled equipment resync
//! - `host`, `hooks`, `commands`, `plugin`: the host-facing adapter layer

pub mod commands;
pub mod hooks;
pub mod host;
pub mod invalidate;
pub mod jobs;
pub mod persist;
pub mod plugin;
pub mod state;
pub mod telemetry;

pub use invalidate::{InvalidateDecision, InvalidationScheduler};
pub use persist::{GatewayOptions, PersistenceGateway, SaveOutcome};
pub use plugin::SelfViewPlugin;
pub use state::VisibilityStore;
