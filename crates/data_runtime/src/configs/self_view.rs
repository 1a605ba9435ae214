//! Process-wide self-view settings carried inside the persisted document.

use std::time::Duration;

pub const DEFAULT_INVALIDATE_COOLDOWN_MS: u64 = 150;
pub const DEFAULT_PICKUP_IMMEDIATE: bool = true;

/// Resync cooldown and pickup policy. Loaded once at startup; a fresh load is
/// the only way to change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfViewCfg {
    pub invalidate_cooldown: Duration,
    pub pickup_immediate: bool,
}

impl Default for SelfViewCfg {
    fn default() -> Self {
        Self {
            invalidate_cooldown: Duration::from_millis(DEFAULT_INVALIDATE_COOLDOWN_MS),
            pickup_immediate: DEFAULT_PICKUP_IMMEDIATE,
        }
    }
}

impl SelfViewCfg {
    #[must_use]
    pub fn cooldown_ms(&self) -> u64 {
        u64::try_from(self.invalidate_cooldown.as_millis()).unwrap_or(u64::MAX)
    }
}
