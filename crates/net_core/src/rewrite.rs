//! Self-view rewrite: blank hidden armor slots in the viewer's own equipment.
//!
//! Input packets may be cached by the transport or shared with other viewers,
//! so nothing reachable from the input is ever mutated. New values are built
//! only along the changed path (batch -> entity update -> equipment); every
//! other branch is carried over by `Arc` clone. When nothing needs changing
//! the caller gets the original packet back.

use std::sync::Arc;

use data_runtime::ids::{NetworkId, PlayerId, SlotMask};

use crate::packet::{ComponentUpdate, EntityUpdate, EntityUpdates, Equipment, Packet, EMPTY_ITEM_ID};
use crate::sink::PacketSink;

/// Read side of the visibility state, as seen by the packet path.
pub trait MaskSource: Send + Sync {
    fn mask(&self, viewer: PlayerId) -> SlotMask;
}

/// Would blanking `mask` change this equipment record?
fn needs_blanking(eq: &Equipment, mask: SlotMask) -> bool {
    !eq.armor_ids.is_empty() && mask.hidden_within(eq.armor_ids.len()).next().is_some()
}

fn blanked(eq: &Equipment, mask: SlotMask) -> Equipment {
    let mut armor: Vec<Arc<str>> = eq.armor_ids.to_vec();
    let empty: Arc<str> = Arc::from(EMPTY_ITEM_ID);
    for slot in mask.hidden_within(armor.len()) {
        armor[slot.index()] = Arc::clone(&empty);
    }
    Equipment {
        armor_ids: Arc::from(armor),
        right_hand_item_id: eq.right_hand_item_id.clone(),
        left_hand_item_id: eq.left_hand_item_id.clone(),
    }
}

/// Rewrite one entity update, or `None` if it has no equipment to blank.
fn rewrite_entity(upd: &EntityUpdate, mask: SlotMask) -> Option<EntityUpdate> {
    let mut components: Option<Vec<ComponentUpdate>> = None;
    for (j, cu) in upd.updates.iter().enumerate() {
        let ComponentUpdate::Equipment(eq) = cu else {
            continue;
        };
        if !needs_blanking(eq, mask) {
            continue;
        }
        let out = components.get_or_insert_with(|| upd.updates.to_vec());
        out[j] = ComponentUpdate::Equipment(Arc::new(blanked(eq, mask)));
    }
    components.map(|c| EntityUpdate {
        network_id: upd.network_id,
        removed: Arc::clone(&upd.removed),
        updates: Arc::from(c),
    })
}

/// Blank `mask` slots in equipment updates addressed to `self_id`.
///
/// Returns `None` when the batch contains nothing to change.
#[must_use]
pub fn rewrite_batch(batch: &EntityUpdates, self_id: NetworkId, mask: SlotMask) -> Option<EntityUpdates> {
    if mask.is_empty() {
        return None;
    }
    let mut updates: Option<Vec<Arc<EntityUpdate>>> = None;
    for (i, upd) in batch.updates.iter().enumerate() {
        if upd.network_id != self_id {
            continue;
        }
        if let Some(copy) = rewrite_entity(upd, mask) {
            let out = updates.get_or_insert_with(|| batch.updates.to_vec());
            out[i] = Arc::new(copy);
        }
    }
    updates.map(|u| EntityUpdates {
        removed: Arc::clone(&batch.removed),
        updates: Arc::from(u),
    })
}

/// Sink wrapper for exactly one viewer. Rewrites inline on the writing thread;
/// no I/O, no allocation unless a rewrite actually happens.
pub struct SelfViewFilter {
    delegate: Arc<dyn PacketSink>,
    masks: Arc<dyn MaskSource>,
    viewer: PlayerId,
    self_network_id: NetworkId,
}

impl SelfViewFilter {
    #[must_use]
    pub fn new(
        delegate: Arc<dyn PacketSink>,
        masks: Arc<dyn MaskSource>,
        viewer: PlayerId,
        self_network_id: NetworkId,
    ) -> Self {
        Self {
            delegate,
            masks,
            viewer,
            self_network_id,
        }
    }

    #[must_use]
    pub fn delegate(&self) -> &Arc<dyn PacketSink> {
        &self.delegate
    }

    /// Returns `packet` itself unless the viewer's own equipment must change.
    #[must_use]
    pub fn rewrite(&self, packet: Packet) -> Packet {
        let mask = self.masks.mask(self.viewer);
        if mask.is_empty() {
            return packet;
        }
        let rewritten = match &packet {
            Packet::EntityUpdates(batch) => rewrite_batch(batch, self.self_network_id, mask),
            Packet::Raw(_) => None,
        };
        match rewritten {
            Some(out) => {
                metrics::counter!("self_view.packets_rewritten_total").increment(1);
                tracing::trace!(target: "rewrite", viewer = %self.viewer, mask = mask.bits(), "blanked self equipment");
                Packet::entity_updates(out)
            }
            None => packet,
        }
    }
}

impl PacketSink for SelfViewFilter {
    fn write(&self, packet: Packet) {
        self.delegate.write(self.rewrite(packet));
    }

    fn write_no_cache(&self, packet: Packet) {
        self.delegate.write_no_cache(self.rewrite(packet));
    }

    fn self_view_owner(&self) -> Option<PlayerId> {
        Some(self.viewer)
    }
}
