//! Plugin lifecycle: wires store, persistence and resync throttling together
//! and exposes one typed entry point per host hook.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use data_runtime::configs::self_view::SelfViewCfg;
use data_runtime::ids::PlayerId;
use net_core::MaskSource;

use crate::commands::SelfViewCommand;
use crate::hooks::{invalidate_mode, GameplayEvent, InteractionType};
use crate::host::{self, PlayerHandle};
use crate::invalidate::{InvalidateDecision, InvalidationScheduler};
use crate::persist::{GatewayOptions, PersistenceGateway, SaveOutcome};
use crate::state::VisibilityStore;

pub const DATA_FILE: &str = "players.json";

pub struct SelfViewPlugin {
    store: Arc<VisibilityStore>,
    gateway: Arc<PersistenceGateway>,
    scheduler: Arc<InvalidationScheduler>,
    cfg: SelfViewCfg,
}

impl SelfViewPlugin {
    pub fn setup(data_dir: &Path) -> Result<Self> {
        Self::setup_with(data_dir, GatewayOptions::default())
    }

    /// Load persisted state from `data_dir/players.json` (seeding it when
    /// missing), then start the save and resync workers.
    pub fn setup_with(data_dir: &Path, options: GatewayOptions) -> Result<Self> {
        let store = Arc::new(VisibilityStore::new());
        let gateway = PersistenceGateway::new(data_dir.join(DATA_FILE), Arc::clone(&store), options)
            .context("start save worker")?;
        let loaded = gateway.load();
        let cfg = gateway.cfg();

        // Wired after load so installing persisted masks never marks state dirty.
        let weak = Arc::downgrade(&gateway);
        store.set_on_change(Box::new(move |_, _| {
            if let Some(gw) = weak.upgrade() {
                gw.mark_dirty();
            }
        }));

        let scheduler = InvalidationScheduler::new(Arc::clone(&store), cfg.invalidate_cooldown)
            .context("start invalidate worker")?;
        tracing::info!(
            target: "self_view",
            players = loaded,
            cooldown_ms = cfg.cooldown_ms(),
            pickup_immediate = cfg.pickup_immediate,
            "self-view enabled (self-only)"
        );
        Ok(Self {
            store,
            gateway,
            scheduler: Arc::new(scheduler),
            cfg,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<VisibilityStore> {
        &self.store
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<PersistenceGateway> {
        &self.gateway
    }

    #[must_use]
    pub fn scheduler(&self) -> &Arc<InvalidationScheduler> {
        &self.scheduler
    }

    #[must_use]
    pub fn cfg(&self) -> SelfViewCfg {
        self.cfg
    }

    /// Install the packet filter on the player's viewer (once) from the
    /// player's world context, and resync right away if something is hidden.
    pub fn on_player_ready(&self, player: &Arc<dyn PlayerHandle>) {
        let Some(world) = player.world() else {
            return;
        };
        let target = Arc::clone(player);
        let store = Arc::clone(&self.store);
        let scheduler = Arc::clone(&self.scheduler);
        host::best_effort("player_ready", move || {
            world.execute(Box::new(move || {
                let Some(viewer) = target.entity_viewer() else {
                    return;
                };
                let masks: Arc<dyn MaskSource> = store.clone();
                if viewer.install_self_view_filter(masks, target.id(), target.network_id()) {
                    tracing::debug!(target: "self_view", player = %target.id(), "self-view filter installed");
                }
                if !store.mask(target.id()).is_empty() {
                    scheduler.request(&target, true);
                }
            }))
        });
    }

    pub fn on_event(&self, player: &Arc<dyn PlayerHandle>, event: GameplayEvent) -> InvalidateDecision {
        match invalidate_mode(event, &self.cfg) {
            Some(immediate) => self.scheduler.request(player, immediate),
            None => InvalidateDecision::Ignored,
        }
    }

    pub fn on_inventory_change(&self, player: &Arc<dyn PlayerHandle>) -> InvalidateDecision {
        self.on_event(player, GameplayEvent::InventoryChanged)
    }

    pub fn on_mouse_button(&self, player: &Arc<dyn PlayerHandle>) -> InvalidateDecision {
        self.on_event(player, GameplayEvent::MouseButton)
    }

    pub fn on_craft(&self, player: &Arc<dyn PlayerHandle>) -> InvalidateDecision {
        self.on_event(player, GameplayEvent::Craft)
    }

    pub fn on_interact(&self, player: &Arc<dyn PlayerHandle>, kind: InteractionType) -> InvalidateDecision {
        self.on_event(player, GameplayEvent::Interact(kind))
    }

    /// Forget resync throttling for a player who disconnected. Their masks
    /// stay in the store and on disk.
    pub fn on_player_disconnect(&self, player: PlayerId) {
        if self.scheduler.forget(player) {
            tracing::trace!(target: "invalidate", player = %player, "throttle state dropped");
        }
    }

    /// Run a chat command for `player`. Returns the feedback line, or `None`
    /// if `name` is not one of ours.
    pub fn on_command(&self, player: &Arc<dyn PlayerHandle>, name: &str) -> Option<String> {
        let cmd: SelfViewCommand = name.parse().ok()?;
        let feedback = cmd.execute(&self.store, player.id());
        if cmd.mutates() {
            self.scheduler.force(player);
        }
        player.send_message(&feedback);
        Some(feedback)
    }

    /// Flush state to disk and stop both workers.
    pub fn shutdown(&self) -> SaveOutcome {
        let outcome = self.gateway.shutdown();
        tracing::info!(target: "self_view", players = outcome.saved_count(), outcome = ?outcome, "self-view disabled");
        self.scheduler.shutdown();
        outcome
    }
}
