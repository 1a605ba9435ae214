//! Persisted self-view document (`players.json`).
//!
//! Schema:
//! ```text
//! {
//!   "players": { "<uuid>": 1..15, ... },
//!   "config": { "invalidateCooldownMs": >0, "pickupImmediate": bool }
//! }
//! ```
//!
//! Reading is tolerant per entry: bad keys, null and non-integral masks are
//! skipped, masks are clamped into range and a clamped zero is dropped. Masks
//! written as `3.0` or `"3"` are accepted. One bad entry never rejects the
//! rest of the document. Writing never emits a
//! zero mask and always replaces the file atomically.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::configs::self_view::SelfViewCfg;
use crate::ids::{PlayerId, SlotMask};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("atomic replace failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConfig {
    #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
    pub invalidate_cooldown_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_immediate: Option<bool>,
}

impl From<&SelfViewCfg> for DocumentConfig {
    fn from(cfg: &SelfViewCfg) -> Self {
        Self {
            invalidate_cooldown_ms: Some(i64::try_from(cfg.cooldown_ms()).unwrap_or(i64::MAX)),
            pickup_immediate: Some(cfg.pickup_immediate),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedDocument {
    #[serde(default)]
    pub players: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub config: Option<DocumentConfig>,
}

/// Why a `players` entry was not installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    BadKey,
    NullMask,
    /// Not an integer (`true`, `"x"`, `2.5`, an object).
    BadMask,
    ZeroMask,
}

/// Integer value of a loosely typed JSON number. Integral floats and numeric
/// strings are accepted; anything past the `i64` range saturates.
fn integral(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    }
}

fn integral_f64(f: f64) -> Option<i64> {
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    // `as` saturates at the i64 bounds
    #[allow(clippy::cast_possible_truncation)]
    let v = f as i64;
    Some(v)
}

fn lenient_int<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(de)?.as_ref().and_then(integral))
}

/// The document after per-entry validation.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub entries: Vec<(PlayerId, SlotMask)>,
    pub cfg: SelfViewCfg,
    pub skipped: Vec<(String, SkipReason)>,
    /// Entries whose stored value was out of range and got clamped.
    pub clamped: Vec<(PlayerId, i64)>,
}

impl PersistedDocument {
    /// Document written when no file exists yet: no players, default config.
    #[must_use]
    pub fn seed() -> Self {
        Self::from_entries(std::iter::empty(), &SelfViewCfg::default())
    }

    /// Build a document from a snapshot. Zero masks are filtered out.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (PlayerId, SlotMask)>,
        cfg: &SelfViewCfg,
    ) -> Self {
        let players = entries
            .into_iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(id, m)| (id.to_string(), Value::from(m.bits())))
            .collect();
        Self {
            players: Some(players),
            config: Some(DocumentConfig::from(cfg)),
        }
    }

    /// Validate entries and fold config values over the defaults.
    #[must_use]
    pub fn resolve(&self) -> Resolved {
        let mut out = Resolved::default();
        if let Some(c) = &self.config {
            if let Some(ms) = c.invalidate_cooldown_ms.filter(|ms| *ms > 0) {
                out.cfg.invalidate_cooldown = Duration::from_millis(ms.unsigned_abs());
            }
            if let Some(p) = c.pickup_immediate {
                out.cfg.pickup_immediate = p;
            }
        }
        let Some(players) = &self.players else {
            return out;
        };
        for (key, value) in players {
            if value.is_null() {
                out.skipped.push((key.clone(), SkipReason::NullMask));
                continue;
            }
            let Some(raw) = integral(value) else {
                out.skipped.push((key.clone(), SkipReason::BadMask));
                continue;
            };
            let mask = SlotMask::clamped(raw);
            if mask.is_empty() {
                out.skipped.push((key.clone(), SkipReason::ZeroMask));
                continue;
            }
            let Ok(id) = key.parse::<PlayerId>() else {
                out.skipped.push((key.clone(), SkipReason::BadKey));
                continue;
            };
            if i64::from(mask.bits()) != raw {
                out.clamped.push((id, raw));
            }
            out.entries.push((id, mask));
        }
        out
    }

    pub fn parse(txt: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(txt)?)
    }

    pub fn read(path: &Path) -> Result<Self, DocumentError> {
        let txt = std::fs::read_to_string(path)?;
        Self::parse(&txt)
    }

    /// Serialize pretty-printed and replace `path` via a sibling temp file.
    pub fn write_atomic(&self, path: &Path) -> Result<(), DocumentError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        Ok(())
    }
}
