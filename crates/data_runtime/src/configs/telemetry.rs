//! Logging and metrics settings for the host process.
//!
//! Read from `data/config/telemetry.toml`. The `LOG_LEVEL`, `JSON_LOGS` and
//! `METRICS_ADDR` environment variables win over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};

/// Filter used when no level is configured: our own targets at info, host
/// boundary noise only when it is a warning.
pub const DEFAULT_FILTER: &str = "info,self_view=info,persist=info,invalidate=info,host=warn";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryCfg {
    /// `EnvFilter` directive string, e.g. `debug` or `info,persist=trace`.
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
    pub metrics_addr: Option<String>, // e.g., 127.0.0.1:9100
}

impl TelemetryCfg {
    #[must_use]
    pub fn filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_FILTER)
    }

    #[must_use]
    pub fn json(&self) -> bool {
        self.json_logs.unwrap_or(false)
    }

    /// Prometheus listener address, if one is configured.
    pub fn metrics_socket(&self) -> Result<Option<SocketAddr>, AddrParseError> {
        self.metrics_addr.as_deref().map(str::parse).transpose()
    }

    fn apply_env(&mut self) {
        if let Ok(lvl) = std::env::var("LOG_LEVEL") {
            self.log_level = Some(lvl);
        }
        if let Ok(addr) = std::env::var("METRICS_ADDR") {
            self.metrics_addr = Some(addr);
        }
        if let Some(json) = std::env::var("JSON_LOGS").ok().and_then(|v| v.parse().ok()) {
            self.json_logs = Some(json);
        }
    }
}

fn data_root() -> PathBuf {
    let here = Path::new(env!("CARGO_MANIFEST_DIR"));
    let ws = here.join("../../data");
    if ws.is_dir() { ws } else { here.join("data") }
}

/// Load from an explicit TOML file; a missing file yields defaults.
pub fn load_from(path: &Path) -> Result<TelemetryCfg> {
    let mut cfg = if path.is_file() {
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        toml::from_str::<TelemetryCfg>(&txt).context("parse telemetry TOML")?
    } else {
        TelemetryCfg::default()
    };
    cfg.apply_env();
    Ok(cfg)
}

pub fn load_default() -> Result<TelemetryCfg> {
    load_from(&data_root().join("config/telemetry.toml"))
}
