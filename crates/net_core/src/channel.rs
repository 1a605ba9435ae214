//! Simple in-proc channel sink for outbound packets.
//!
//! Uses `std::sync::mpsc` under the hood and exposes non-blocking drain
//! helpers, which is all the demo host and the tests need.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::packet::Packet;
use crate::sink::PacketSink;

/// A packet as it reached the transport.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub packet: Packet,
    pub cached: bool,
}

#[derive(Clone)]
pub struct ChannelSink(Sender<Delivered>);
pub struct Rx(Receiver<Delivered>);

/// Create a sink/receiver pair. The underlying channel is unbounded.
#[must_use]
pub fn channel() -> (ChannelSink, Rx) {
    let (s, r) = mpsc::channel::<Delivered>();
    (ChannelSink(s), Rx(r))
}

impl PacketSink for ChannelSink {
    fn write(&self, packet: Packet) {
        // receiver gone means the client disconnected; nothing to deliver to
        let _ = self.0.send(Delivered { packet, cached: true });
    }
    fn write_no_cache(&self, packet: Packet) {
        let _ = self.0.send(Delivered { packet, cached: false });
    }
}

impl Rx {
    /// Non-blocking receive of a single packet.
    #[must_use]
    pub fn try_recv(&self) -> Option<Delivered> {
        self.0.try_recv().ok()
    }
    /// Drain all currently queued packets.
    #[must_use]
    pub fn drain(&self) -> Vec<Delivered> {
        let mut out = Vec::new();
        while let Some(d) = self.try_recv() {
            out.push(d);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn send_and_drain() {
        let (tx, rx) = channel();
        tx.write(Packet::raw(1, vec![1, 2, 3]));
        tx.write_no_cache(Packet::raw(2, vec![4, 5]));
        let drained = rx.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained[0].cached);
        assert!(!drained[1].cached);
    }

    #[test]
    fn write_after_receiver_drop_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        tx.write(Packet::raw(1, vec![]));
    }
}
