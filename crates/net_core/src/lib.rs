//! `net_core`: outbound packet model and per-viewer packet plumbing.
//!
//! Scope
//! - Entity-update batch types with `Arc`-shared nested arrays
//! - `PacketSink` seam plus the per-viewer `EntityViewer` slot
//! - Copy-on-write self-view rewrite filter
//!
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod channel;
pub mod packet;
pub mod rewrite;
pub mod sink;

pub use rewrite::{MaskSource, SelfViewFilter};
pub use sink::{EntityViewer, PacketSink};
