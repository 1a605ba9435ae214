//! Live per-player hidden-slot masks.
//!
//! Concurrent map keyed by `PlayerId`; any thread may read or toggle. Each
//! mutation is one atomic update of that player's entry, and the change hook
//! is invoked after the entry lock has been released.

use std::collections::HashMap;
use std::sync::OnceLock;

use dashmap::DashMap;
use data_runtime::ids::{ArmorSlot, PlayerId, SlotMask};
use net_core::MaskSource;

pub type ChangeHook = Box<dyn Fn(PlayerId, SlotMask) + Send + Sync>;

#[derive(Default)]
pub struct VisibilityStore {
    masks: DashMap<PlayerId, SlotMask>,
    on_change: OnceLock<ChangeHook>,
}

impl VisibilityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the change notification. Only the first call takes effect.
    pub fn set_on_change(&self, hook: ChangeHook) -> bool {
        self.on_change.set(hook).is_ok()
    }

    fn notify(&self, player: PlayerId, mask: SlotMask) {
        if let Some(hook) = self.on_change.get() {
            hook(player, mask);
        }
    }

    /// Flip one slot and return the new mask.
    pub fn toggle_slot(&self, player: PlayerId, slot: ArmorSlot) -> SlotMask {
        let mask = {
            let mut entry = self.masks.entry(player).or_default();
            *entry = entry.toggled(slot);
            *entry
        };
        self.notify(player, mask);
        mask
    }

    /// Hide every tracked slot, or show them all if all are already hidden.
    pub fn toggle_all(&self, player: PlayerId) -> SlotMask {
        let mask = {
            let mut entry = self.masks.entry(player).or_default();
            *entry = if *entry == SlotMask::FULL { SlotMask::EMPTY } else { SlotMask::FULL };
            *entry
        };
        self.notify(player, mask);
        mask
    }

    /// Install a mask without firing the change hook (startup load).
    pub fn set_mask_silently(&self, player: PlayerId, mask: SlotMask) {
        self.masks.insert(player, mask);
    }

    #[must_use]
    pub fn mask(&self, player: PlayerId) -> SlotMask {
        self.masks.get(&player).map_or(SlotMask::EMPTY, |m| *m)
    }

    #[must_use]
    pub fn is_hidden(&self, player: PlayerId, slot: ArmorSlot) -> bool {
        self.mask(player).is_hidden(slot)
    }

    /// Copy of all entries, zero masks included. Shards are read one at a
    /// time, so writers are never blocked for the whole copy.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<PlayerId, SlotMask> {
        self.masks.iter().map(|e| (*e.key(), *e.value())).collect()
    }
}

impl MaskSource for VisibilityStore {
    fn mask(&self, viewer: PlayerId) -> SlotMask {
        VisibilityStore::mask(self, viewer)
    }
}
