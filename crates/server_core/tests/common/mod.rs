//! In-process fake host shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use data_runtime::ids::{NetworkId, PlayerId};
use net_core::channel::{self, Rx};
use net_core::EntityViewer;
use server_core::host::{HostError, PlayerHandle, WorldContext, WorldTask};

/// World context that runs tasks inline on the calling thread.
#[derive(Default)]
pub struct InlineWorld {
    pub executed: AtomicUsize,
}

impl WorldContext for InlineWorld {
    fn execute(&self, task: WorldTask) -> Result<(), HostError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        task();
        Ok(())
    }
}

pub struct FakePlayer {
    pub id: PlayerId,
    pub net: NetworkId,
    pub world: Option<Arc<InlineWorld>>,
    pub viewer: Option<Arc<EntityViewer>>,
    pub invalidations: Mutex<Vec<Instant>>,
    pub messages: Mutex<Vec<String>>,
    pub gone: AtomicBool,
}

impl FakePlayer {
    pub fn invalidation_count(&self) -> usize {
        self.invalidations.lock().unwrap().len()
    }
}

impl PlayerHandle for FakePlayer {
    fn id(&self) -> PlayerId {
        self.id
    }
    fn network_id(&self) -> NetworkId {
        self.net
    }
    fn world(&self) -> Option<Arc<dyn WorldContext>> {
        self.world.clone().map(|w| w as Arc<dyn WorldContext>)
    }
    fn entity_viewer(&self) -> Option<Arc<EntityViewer>> {
        self.viewer.clone()
    }
    fn invalidate_equipment_network(&self) -> Result<(), HostError> {
        if self.gone.load(Ordering::SeqCst) {
            return Err(HostError::PlayerGone);
        }
        self.invalidations.lock().unwrap().push(Instant::now());
        Ok(())
    }
    fn send_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

/// Player with a world and a channel-backed viewer; returns the packet receiver too.
pub fn player(net: i32) -> (Arc<FakePlayer>, Rx) {
    let (tx, rx) = channel::channel();
    let p = FakePlayer {
        id: PlayerId::new_v4(),
        net: NetworkId(net),
        world: Some(Arc::new(InlineWorld::default())),
        viewer: Some(Arc::new(EntityViewer::new(Arc::new(tx)))),
        invalidations: Mutex::new(Vec::new()),
        messages: Mutex::new(Vec::new()),
        gone: AtomicBool::new(false),
    };
    (Arc::new(p), rx)
}

/// Player whose world reference is stale.
pub fn worldless_player() -> Arc<FakePlayer> {
    Arc::new(FakePlayer {
        id: PlayerId::new_v4(),
        net: NetworkId(0),
        world: None,
        viewer: None,
        invalidations: Mutex::new(Vec::new()),
        messages: Mutex::new(Vec::new()),
        gone: AtomicBool::new(false),
    })
}

pub fn handle(p: &Arc<FakePlayer>) -> Arc<dyn PlayerHandle> {
    p.clone()
}
