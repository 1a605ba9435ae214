//! Host boundary: what the self-view core needs from the game server.
//!
//! Calls across this edge are best-effort. A player may disconnect or change
//! worlds between the moment a request is accepted and the moment it runs;
//! such failures are logged once in `best_effort` and otherwise ignored.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use data_runtime::ids::{NetworkId, PlayerId};
use net_core::EntityViewer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("player is no longer connected")]
    PlayerGone,
    #[error("player has no world")]
    WorldUnavailable,
    #[error("host rejected call: {0}")]
    Rejected(String),
}

pub type WorldTask = Box<dyn FnOnce() + Send + 'static>;

/// A world's single-threaded execution context.
pub trait WorldContext: Send + Sync {
    fn execute(&self, task: WorldTask) -> Result<(), HostError>;
}

/// A connected player as exposed by the host.
pub trait PlayerHandle: Send + Sync {
    fn id(&self) -> PlayerId;
    fn network_id(&self) -> NetworkId;
    fn world(&self) -> Option<Arc<dyn WorldContext>>;
    /// Viewer component holding the player's outbound packet sink.
    fn entity_viewer(&self) -> Option<Arc<EntityViewer>>;
    /// Resend the player's current equipment to clients. Must be called on
    /// the player's world context.
    fn invalidate_equipment_network(&self) -> Result<(), HostError>;
    fn send_message(&self, text: &str);
}

/// Run a host call, swallowing errors and panics. The only place host
/// failures are reported.
pub fn best_effort<T>(site: &'static str, f: impl FnOnce() -> Result<T, HostError>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(v)) => Some(v),
        Ok(Err(e)) => {
            tracing::debug!(target: "host", site, error = %e, "host call failed");
            metrics::counter!("server.errors_total", "site" => site).increment(1);
            None
        }
        Err(_) => {
            tracing::warn!(target: "host", site, "host call panicked");
            metrics::counter!("server.errors_total", "site" => site).increment(1);
            None
        }
    }
}

/// Queue an equipment resend on the player's own world context.
pub fn dispatch_invalidate(player: &Arc<dyn PlayerHandle>) {
    let target = Arc::clone(player);
    best_effort("invalidate.dispatch", move || {
        let world = target.world().ok_or(HostError::WorldUnavailable)?;
        world.execute(Box::new(move || {
            best_effort("invalidate.run", || target.invalidate_equipment_network());
        }))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_effort_passes_values_and_swallows_failures() {
        assert_eq!(best_effort("test.ok", || Ok(5)), Some(5));
        assert_eq!(best_effort::<()>("test.err", || Err(HostError::PlayerGone)), None);
        assert_eq!(best_effort::<()>("test.panic", || panic!("host blew up")), None);
    }
}
