//! Packet sink abstraction and the per-viewer sink slot.
//!
//! Implementations:
//! - `channel::ChannelSink`: in-proc delivery for demo/local server
//! - `rewrite::SelfViewFilter`: wraps another sink for one viewer

use std::sync::Arc;

use data_runtime::ids::{NetworkId, PlayerId};
use parking_lot::RwLock;

use crate::packet::Packet;
use crate::rewrite::{MaskSource, SelfViewFilter};

/// Outbound packet stream for one client.
pub trait PacketSink: Send + Sync {
    fn write(&self, packet: Packet);
    /// Same as `write`, but the transport must not cache the encoded form.
    fn write_no_cache(&self, packet: Packet);
    /// `Some(viewer)` when this sink is a self-view filter.
    fn self_view_owner(&self) -> Option<PlayerId> {
        None
    }
}

/// The host's per-player viewer component: holds the sink packets for that
/// player are written to. The sink may be swapped (wrapped) at runtime.
pub struct EntityViewer {
    sink: RwLock<Arc<dyn PacketSink>>,
}

impl EntityViewer {
    #[must_use]
    pub fn new(sink: Arc<dyn PacketSink>) -> Self {
        Self {
            sink: RwLock::new(sink),
        }
    }

    #[must_use]
    pub fn sink(&self) -> Arc<dyn PacketSink> {
        self.sink.read().clone()
    }

    pub fn write(&self, packet: Packet) {
        self.sink().write(packet);
    }

    pub fn write_no_cache(&self, packet: Packet) {
        self.sink().write_no_cache(packet);
    }

    /// Wrap the current sink in a `SelfViewFilter` unless one is already
    /// installed. Returns whether a filter was installed by this call.
    pub fn install_self_view_filter(
        &self,
        masks: Arc<dyn MaskSource>,
        viewer: PlayerId,
        self_network_id: NetworkId,
    ) -> bool {
        let mut slot = self.sink.write();
        if slot.self_view_owner().is_some() {
            return false;
        }
        let delegate: Arc<dyn PacketSink> = (*slot).clone();
        *slot = Arc::new(SelfViewFilter::new(delegate, masks, viewer, self_network_id));
        true
    }
}
