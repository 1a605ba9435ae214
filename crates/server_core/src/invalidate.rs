//! Equipment resync throttling.
//!
//! Clients can silently revert equipment visuals on many gameplay events, so
//! a resend is requested often. Requests are throttled per player to one
//! execution per cooldown, with a single trailing execution for anything
//! that arrives inside the window.
//!
//! Per player the state is one of:
//! - Idle: no deferred task armed (possibly with a last-execution time)
//! - `PendingDeferred(fire_at)`: exactly one task armed on the worker
//! - Executing: the deferred task is running and clearing itself
//!
//! Every transition happens while holding that player's map entry, so the
//! elapsed-time check and arming a task cannot interleave.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use data_runtime::ids::PlayerId;

use crate::host::{self, PlayerHandle};
use crate::jobs::{ScheduledWorker, TaskHandle};
use crate::state::VisibilityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidateDecision {
    /// Nothing hidden for this player; request dropped.
    Ignored,
    /// Resync dispatched now.
    Executed,
    /// One deferred resync armed to fire after `delay`.
    Scheduled { delay: Duration },
    /// A deferred resync is already armed; it covers this request.
    Coalesced,
}

struct Pending {
    token: u64,
    handle: TaskHandle,
    fire_at: Instant,
}

#[derive(Default)]
struct Throttle {
    last: Option<Instant>,
    pending: Option<Pending>,
}

impl Throttle {
    fn live_pending(&self) -> Option<&Pending> {
        self.pending.as_ref().filter(|p| !p.handle.is_done())
    }
}

pub struct InvalidationScheduler {
    store: Arc<VisibilityStore>,
    cooldown: Duration,
    throttles: Arc<DashMap<PlayerId, Throttle>>,
    next_token: AtomicU64,
    worker: ScheduledWorker,
}

impl InvalidationScheduler {
    pub fn new(store: Arc<VisibilityStore>, cooldown: Duration) -> std::io::Result<Self> {
        Ok(Self {
            store,
            cooldown,
            throttles: Arc::new(DashMap::new()),
            next_token: AtomicU64::new(1),
            worker: ScheduledWorker::spawn("hide-armor-invalidate")?,
        })
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Request an equipment resync for `player`.
    pub fn request(&self, player: &Arc<dyn PlayerHandle>, immediate: bool) -> InvalidateDecision {
        let id = player.id();
        if self.store.mask(id).is_empty() {
            return InvalidateDecision::Ignored;
        }
        let decision = if immediate {
            self.take_immediate(id)
        } else {
            self.take_standard(player)
        };
        let mode = if immediate { "immediate" } else { "standard" };
        match decision {
            InvalidateDecision::Executed => {
                metrics::counter!("self_view.invalidate_total", "mode" => mode).increment(1);
                host::dispatch_invalidate(player);
            }
            InvalidateDecision::Scheduled { delay } => {
                tracing::trace!(target: "invalidate", player = %id, delay = ?delay, "deferred resync armed");
            }
            InvalidateDecision::Ignored | InvalidateDecision::Coalesced => {}
        }
        decision
    }

    /// Immediate resync regardless of the current mask. Used after a toggle,
    /// where un-hiding must also reach the client right away.
    pub fn force(&self, player: &Arc<dyn PlayerHandle>) {
        self.take_immediate(player.id());
        metrics::counter!("self_view.invalidate_total", "mode" => "forced").increment(1);
        host::dispatch_invalidate(player);
    }

    fn take_immediate(&self, id: PlayerId) -> InvalidateDecision {
        let mut t = self.throttles.entry(id).or_default();
        if let Some(p) = t.pending.take() {
            p.handle.cancel();
        }
        t.last = Some(Instant::now());
        InvalidateDecision::Executed
    }

    fn take_standard(&self, player: &Arc<dyn PlayerHandle>) -> InvalidateDecision {
        let id = player.id();
        let mut t = self.throttles.entry(id).or_default();
        let now = Instant::now();
        let elapsed = t.last.map(|last| now.saturating_duration_since(last));
        let remaining = match elapsed {
            Some(e) if e < self.cooldown => self.cooldown - e,
            _ => {
                t.last = Some(now);
                return InvalidateDecision::Executed;
            }
        };
        if t.live_pending().is_some() {
            return InvalidateDecision::Coalesced;
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let throttles = Arc::clone(&self.throttles);
        let target = Arc::clone(player);
        let handle = self.worker.schedule(remaining, move || fire_deferred(&throttles, &target, token));
        t.pending = Some(Pending {
            token,
            handle,
            fire_at: now + remaining,
        });
        InvalidateDecision::Scheduled { delay: remaining }
    }

    /// Fire time of the armed deferred resync, if any.
    #[must_use]
    pub fn pending_fire_at(&self, player: PlayerId) -> Option<Instant> {
        self.throttles
            .get(&player)
            .and_then(|t| t.live_pending().map(|p| p.fire_at))
    }

    #[must_use]
    pub fn last_executed(&self, player: PlayerId) -> Option<Instant> {
        self.throttles.get(&player).and_then(|t| t.last)
    }

    /// Drop throttle state for a player who left. An armed resync that has
    /// not started is cancelled. Returns whether anything was tracked.
    pub fn forget(&self, player: PlayerId) -> bool {
        let Some((_, t)) = self.throttles.remove(&player) else {
            return false;
        };
        if let Some(p) = t.pending {
            p.handle.cancel();
        }
        true
    }

    /// Players with throttle state.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.throttles.len()
    }

    /// Stop the worker; armed deferred resyncs are abandoned.
    pub fn shutdown(&self) {
        self.worker.shutdown();
    }
}

fn fire_deferred(throttles: &DashMap<PlayerId, Throttle>, player: &Arc<dyn PlayerHandle>, token: u64) {
    let id = player.id();
    if let Some(mut t) = throttles.get_mut(&id) {
        if t.pending.as_ref().is_some_and(|p| p.token == token) {
            t.pending = None;
        }
        t.last = Some(Instant::now());
    }
    metrics::counter!("self_view.invalidate_total", "mode" => "deferred").increment(1);
    host::dispatch_invalidate(player);
}
