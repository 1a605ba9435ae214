//! Stable identifiers and the per-player hidden-slot mask.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Stable player identity (account UUID). Survives reconnects and is the
/// key of the persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PlayerId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Per-session network id of an entity as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId(pub i32);

/// Armor slots tracked for self-view hiding, in protocol armor-array order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArmorSlot {
    Head = 0,
    Chest = 1,
    Hands = 2,
    Legs = 3,
}

impl ArmorSlot {
    pub const ALL: [ArmorSlot; 4] = [Self::Head, Self::Chest, Self::Hands, Self::Legs];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Chest => "chest",
            Self::Hands => "hands",
            Self::Legs => "legs",
        }
    }
}

/// 4-bit hidden-slot mask. Bit `i` set means slot `i` is hidden.
///
/// Every constructor clamps into `[0, 15]`, so a `SlotMask` can never carry
/// bits outside the tracked slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SlotMask(u8);

impl SlotMask {
    pub const MAX: u8 = 15;
    pub const EMPTY: SlotMask = SlotMask(0);
    pub const FULL: SlotMask = SlotMask(Self::MAX);

    /// Clamp an arbitrary integer (e.g. a value read from disk) into range.
    #[must_use]
    pub fn clamped(raw: i64) -> Self {
        Self(u8::try_from(raw.clamp(0, i64::from(Self::MAX))).unwrap_or(Self::MAX))
    }

    #[inline]
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub fn is_hidden(self, slot: ArmorSlot) -> bool {
        (self.0 >> slot.index()) & 1 == 1
    }

    #[must_use]
    pub fn toggled(self, slot: ArmorSlot) -> Self {
        Self::clamped(i64::from(self.0 ^ (1 << slot.index())))
    }

    /// Hidden slots whose index falls inside an armor array of `len` entries.
    pub fn hidden_within(self, len: usize) -> impl Iterator<Item = ArmorSlot> {
        ArmorSlot::ALL
            .into_iter()
            .filter(move |s| self.is_hidden(*s) && s.index() < len)
    }
}
