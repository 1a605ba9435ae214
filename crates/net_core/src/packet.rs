//! Outbound packet types.
//!
//! Nested arrays are `Arc`-shared so one encoded batch can be handed to many
//! viewers, and so a per-viewer rewrite can replace a single branch while the
//! rest of the tree stays reference-identical to the input.

use std::sync::Arc;

use data_runtime::ids::NetworkId;

/// Item id written into a blanked armor slot.
pub const EMPTY_ITEM_ID: &str = "";

#[derive(Debug, Clone)]
pub enum Packet {
    EntityUpdates(Arc<EntityUpdates>),
    /// Any other packet; passed through untouched.
    Raw(Arc<RawPacket>),
}

impl Packet {
    #[must_use]
    pub fn raw(id: u16, payload: Vec<u8>) -> Self {
        Self::Raw(Arc::new(RawPacket { id, payload }))
    }

    #[must_use]
    pub fn entity_updates(batch: EntityUpdates) -> Self {
        Self::EntityUpdates(Arc::new(batch))
    }

    /// True when both values point at the same underlying packet.
    #[must_use]
    pub fn ptr_eq(&self, other: &Packet) -> bool {
        match (self, other) {
            (Self::EntityUpdates(a), Self::EntityUpdates(b)) => Arc::ptr_eq(a, b),
            (Self::Raw(a), Self::Raw(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct RawPacket {
    pub id: u16,
    pub payload: Vec<u8>,
}

/// A batch of per-entity updates sent to one client.
#[derive(Debug, Clone)]
pub struct EntityUpdates {
    /// Entities leaving the client's view.
    pub removed: Arc<[NetworkId]>,
    pub updates: Arc<[Arc<EntityUpdate>]>,
}

impl EntityUpdates {
    #[must_use]
    pub fn new(updates: Vec<EntityUpdate>) -> Self {
        Self {
            removed: Arc::from(Vec::new()),
            updates: updates.into_iter().map(Arc::new).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntityUpdate {
    pub network_id: NetworkId,
    /// Component types removed from the entity.
    pub removed: Arc<[ComponentUpdateType]>,
    pub updates: Arc<[ComponentUpdate]>,
}

impl EntityUpdate {
    #[must_use]
    pub fn new(network_id: NetworkId, updates: Vec<ComponentUpdate>) -> Self {
        Self {
            network_id,
            removed: Arc::from(Vec::new()),
            updates: Arc::from(updates),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentUpdateType {
    Transform,
    Equipment,
    Model,
    Nameplate,
    Health,
    Effects,
}

#[derive(Debug, Clone)]
pub enum ComponentUpdate {
    Equipment(Arc<Equipment>),
    /// Component payload this crate does not interpret.
    Opaque {
        kind: ComponentUpdateType,
        payload: Arc<[u8]>,
    },
}

impl ComponentUpdate {
    #[must_use]
    pub fn kind(&self) -> ComponentUpdateType {
        match self {
            Self::Equipment(_) => ComponentUpdateType::Equipment,
            Self::Opaque { kind, .. } => *kind,
        }
    }
}

/// Visual equipment of an entity. `armor_ids` is indexed by armor slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equipment {
    pub armor_ids: Arc<[Arc<str>]>,
    pub right_hand_item_id: Option<Arc<str>>,
    pub left_hand_item_id: Option<Arc<str>>,
}

impl Equipment {
    #[must_use]
    pub fn with_armor<S: AsRef<str>>(armor: &[S]) -> Self {
        Self {
            armor_ids: armor.iter().map(|s| Arc::from(s.as_ref())).collect(),
            right_hand_item_id: None,
            left_hand_item_id: None,
        }
    }
}
