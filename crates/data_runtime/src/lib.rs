//! data_runtime: identifiers, persisted schemas and config loaders.
//!
//! Shared by `net_core` (ids and masks for packet rewriting) and
//! `server_core` (document load/save, runtime settings).

pub mod document;
pub mod ids;
pub mod configs {
    pub mod self_view;
    pub mod telemetry;
}
