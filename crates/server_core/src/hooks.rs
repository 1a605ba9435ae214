//! Gameplay events that can make a client drop its hidden-armor view, and
//! whether each one asks for an immediate or a throttled resync.

use data_runtime::configs::self_view::SelfViewCfg;

/// Interaction kinds reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionType {
    Primary,
    Secondary,
    Ability1,
    Ability2,
    Ability3,
    Use,
    Pick,
    Pickup,
    CollisionEnter,
    CollisionLeave,
    SwapTo,
    SwapFrom,
    Death,
    Wielding,
    Equipped,
    Held,
    HeldOffhand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameplayEvent {
    InventoryChanged,
    MouseButton,
    Craft,
    Interact(InteractionType),
}

/// `Some(immediate)` when the event should request a resync, `None` when it
/// is not tracked.
#[must_use]
pub fn invalidate_mode(event: GameplayEvent, cfg: &SelfViewCfg) -> Option<bool> {
    use InteractionType as I;
    match event {
        GameplayEvent::InventoryChanged | GameplayEvent::MouseButton | GameplayEvent::Craft => Some(false),
        GameplayEvent::Interact(I::Pickup) => Some(cfg.pickup_immediate),
        GameplayEvent::Interact(
            I::Primary | I::Secondary | I::Use | I::Pick | I::SwapTo | I::SwapFrom | I::Wielding | I::Equipped,
        ) => Some(false),
        GameplayEvent::Interact(_) => None,
    }
}
