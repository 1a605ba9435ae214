//! Minimal in-process host: one queued world thread and scripted players.
//!
//! Stands in for the game server so the binary and end-to-end tests can drive
//! the plugin through the same hooks a real host would call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use data_runtime::ids::{NetworkId, PlayerId};
use net_core::packet::{ComponentUpdate, EntityUpdate, EntityUpdates, Equipment, Packet};
use net_core::{EntityViewer, PacketSink};
use parking_lot::{Mutex, RwLock};
use server_core::host::{HostError, PlayerHandle, WorldContext, WorldTask};

/// World context backed by a task queue; tasks only run when `pump` is called
/// from the thread that owns the world.
pub struct QueuedWorld {
    tx: Sender<WorldTask>,
    rx: Mutex<Receiver<WorldTask>>,
}

impl Default for QueuedWorld {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx: Mutex::new(rx) }
    }
}

impl QueuedWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run queued tasks, including ones queued while pumping. Returns how many ran.
    pub fn pump(&self) -> usize {
        let rx = self.rx.lock();
        let mut ran = 0;
        while let Ok(task) = rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }
}

impl WorldContext for QueuedWorld {
    fn execute(&self, task: WorldTask) -> Result<(), HostError> {
        self.tx
            .send(task)
            .map_err(|_| HostError::Rejected("world stopped".to_string()))
    }
}

pub struct DemoPlayer {
    id: PlayerId,
    network_id: NetworkId,
    world: RwLock<Option<Arc<QueuedWorld>>>,
    viewer: Arc<EntityViewer>,
    equipment: Arc<Equipment>,
    resyncs: AtomicUsize,
    messages: Mutex<Vec<String>>,
}

impl DemoPlayer {
    pub fn spawn(
        id: PlayerId,
        network_id: NetworkId,
        world: &Arc<QueuedWorld>,
        sink: Arc<dyn PacketSink>,
        armor: &[&str],
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            network_id,
            world: RwLock::new(Some(Arc::clone(world))),
            viewer: Arc::new(EntityViewer::new(sink)),
            equipment: Arc::new(Equipment::with_armor(armor)),
            resyncs: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
        })
    }

    /// Drop the world reference, as a host does while a player changes worlds.
    pub fn leave_world(&self) {
        *self.world.write() = None;
    }

    #[must_use]
    pub fn viewer(&self) -> &Arc<EntityViewer> {
        &self.viewer
    }

    #[must_use]
    pub fn resyncs(&self) -> usize {
        self.resyncs.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Equipment update for this player's own entity, as the host would send it.
    #[must_use]
    pub fn equipment_packet(&self) -> Packet {
        Packet::entity_updates(EntityUpdates::new(vec![EntityUpdate::new(
            self.network_id,
            vec![ComponentUpdate::Equipment(Arc::clone(&self.equipment))],
        )]))
    }
}

impl PlayerHandle for DemoPlayer {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn network_id(&self) -> NetworkId {
        self.network_id
    }

    fn world(&self) -> Option<Arc<dyn WorldContext>> {
        self.world
            .read()
            .clone()
            .map(|w| w as Arc<dyn WorldContext>)
    }

    fn entity_viewer(&self) -> Option<Arc<EntityViewer>> {
        Some(Arc::clone(&self.viewer))
    }

    fn invalidate_equipment_network(&self) -> Result<(), HostError> {
        if self.world.read().is_none() {
            return Err(HostError::PlayerGone);
        }
        self.resyncs.fetch_add(1, Ordering::SeqCst);
        self.viewer.write_no_cache(self.equipment_packet());
        Ok(())
    }

    fn send_message(&self, text: &str) {
        tracing::info!(target: "chat", player = %self.id, "{text}");
        self.messages.lock().push(text.to_string());
    }
}

/// Armor ids of `entity`'s equipment in `packet`, if the packet carries one.
#[must_use]
pub fn armor_of(packet: &Packet, entity: NetworkId) -> Option<Vec<String>> {
    let Packet::EntityUpdates(batch) = packet else {
        return None;
    };
    batch
        .updates
        .iter()
        .filter(|u| u.network_id == entity)
        .flat_map(|u| u.updates.iter())
        .find_map(|c| match c {
            ComponentUpdate::Equipment(eq) => Some(eq.armor_ids.iter().map(ToString::to_string).collect()),
            ComponentUpdate::Opaque { .. } => None,
        })
}
