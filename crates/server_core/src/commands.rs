//! Player chat commands.

use std::fmt::Write as _;
use std::str::FromStr;

use data_runtime::ids::{ArmorSlot, PlayerId};
use thiserror::Error;

use crate::state::VisibilityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfViewCommand {
    /// `/hidehelmet`: toggle the head slot.
    HideHelmet,
    /// `/hidearmor`: toggle all four slots together.
    HideArmor,
    /// `/hhdebug`: print slot indices and the caller's mask.
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for SelfViewCommand {
    type Err = UnknownCommand;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/');
        match name.to_ascii_lowercase().as_str() {
            "hidehelmet" => Ok(Self::HideHelmet),
            "hidearmor" => Ok(Self::HideArmor),
            "hhdebug" => Ok(Self::Debug),
            _ => Err(UnknownCommand(name.to_string())),
        }
    }
}

impl SelfViewCommand {
    pub const ALL: [SelfViewCommand; 3] = [Self::HideHelmet, Self::HideArmor, Self::Debug];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HideHelmet => "hidehelmet",
            Self::HideArmor => "hidearmor",
            Self::Debug => "hhdebug",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::HideHelmet => "Toggle helmet visibility",
            Self::HideArmor => "Toggle armor visibility",
            Self::Debug => "Print armor slot indices",
        }
    }

    /// Whether running the command changes the caller's mask.
    #[must_use]
    pub fn mutates(self) -> bool {
        !matches!(self, Self::Debug)
    }

    /// Apply the command for `player` and return the feedback line.
    pub fn execute(self, store: &VisibilityStore, player: PlayerId) -> String {
        match self {
            Self::HideHelmet => {
                let on = store.toggle_slot(player, ArmorSlot::Head).is_hidden(ArmorSlot::Head);
                format!("HideHelmet: {}", if on { "ON" } else { "OFF" })
            }
            Self::HideArmor => {
                let on = !store.toggle_all(player).is_empty();
                format!("HideArmor: {}", if on { "ON" } else { "OFF" })
            }
            Self::Debug => {
                let mask = store.mask(player);
                let mut out = String::from("Armor slots:");
                for slot in ArmorSlot::ALL {
                    let _ = write!(out, " {}={}", slot.name(), slot.index());
                }
                let _ = write!(out, " | mask={}", mask.bits());
                let hidden: Vec<&str> = ArmorSlot::ALL
                    .into_iter()
                    .filter(|s| mask.is_hidden(*s))
                    .map(ArmorSlot::name)
                    .collect();
                if !hidden.is_empty() {
                    let _ = write!(out, " ({})", hidden.join(", "));
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_with_or_without_slash() {
        assert_eq!("hidehelmet".parse::<SelfViewCommand>(), Ok(SelfViewCommand::HideHelmet));
        assert_eq!("/HideArmor".parse::<SelfViewCommand>(), Ok(SelfViewCommand::HideArmor));
        assert_eq!(" hhdebug ".parse::<SelfViewCommand>(), Ok(SelfViewCommand::Debug));
        assert!("hidepants".parse::<SelfViewCommand>().is_err());
        for c in SelfViewCommand::ALL {
            assert_eq!(c.name().parse::<SelfViewCommand>(), Ok(c));
        }
    }

    #[test]
    fn helmet_feedback_toggles_on_off() {
        let s = VisibilityStore::new();
        let p = PlayerId::new_v4();
        assert_eq!(SelfViewCommand::HideHelmet.execute(&s, p), "HideHelmet: ON");
        assert!(s.is_hidden(p, ArmorSlot::Head));
        assert_eq!(SelfViewCommand::HideHelmet.execute(&s, p), "HideHelmet: OFF");
        assert!(s.mask(p).is_empty());
    }

    #[test]
    fn armor_toggle_and_debug_output() {
        let s = VisibilityStore::new();
        let p = PlayerId::new_v4();
        assert_eq!(SelfViewCommand::HideArmor.execute(&s, p), "HideArmor: ON");
        let dbg = SelfViewCommand::Debug.execute(&s, p);
        assert!(dbg.starts_with("Armor slots: head=0 chest=1 hands=2 legs=3"));
        assert!(dbg.ends_with("mask=15 (head, chest, hands, legs)"));
        assert_eq!(SelfViewCommand::HideArmor.execute(&s, p), "HideArmor: OFF");
        assert!(!SelfViewCommand::Debug.mutates());
    }
}
