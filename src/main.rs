//! Demo host: runs one scripted player through the self-view hooks.
//! Usage: cargo run -- [data_dir] [player_uuid]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use hide_armor::data::configs::telemetry;
use hide_armor::data::ids::{NetworkId, PlayerId};
use hide_armor::demo::{armor_of, DemoPlayer, QueuedWorld};
use hide_armor::net::channel;
use hide_armor::server::host::PlayerHandle;
use hide_armor::server::telemetry::init_telemetry;
use hide_armor::server::SelfViewPlugin;

fn main() -> Result<()> {
    let cfg = telemetry::load_default()?;
    let _telemetry = init_telemetry(&cfg)?;

    let mut args = std::env::args().skip(1);
    let data_dir = args.next().map_or_else(|| PathBuf::from("data"), PathBuf::from);
    let id = match args.next() {
        Some(s) => s.parse::<PlayerId>().with_context(|| format!("player id: {s}"))?,
        None => PlayerId::new_v4(),
    };

    let plugin = SelfViewPlugin::setup(&data_dir)?;
    let world = Arc::new(QueuedWorld::new());
    let (sink, rx) = channel::channel();
    let net = NetworkId(1);
    let player = DemoPlayer::spawn(id, net, &world, Arc::new(sink), &["iron_helm", "iron_chest", "iron_gloves", "iron_legs"]);
    let handle: Arc<dyn PlayerHandle> = player.clone();

    plugin.on_player_ready(&handle);
    world.pump();
    for cmd in ["hhdebug", "hidehelmet", "hidearmor", "hidehelmet", "hhdebug"] {
        plugin.on_command(&handle, cmd);
        world.pump();
        player.viewer().write(player.equipment_packet());
        for d in rx.drain() {
            if let Some(armor) = armor_of(&d.packet, net) {
                tracing::info!(target: "demo", command = cmd, cached = d.cached, ?armor, "client sees");
            }
        }
    }

    plugin.on_inventory_change(&handle);
    plugin.on_inventory_change(&handle);
    std::thread::sleep(plugin.cfg().invalidate_cooldown * 2);
    world.pump();
    tracing::info!(target: "demo", resyncs = player.resyncs(), "resyncs sent");

    plugin.on_player_disconnect(id);
    let outcome = plugin.shutdown();
    tracing::info!(
        target: "demo",
        player = %id,
        saved = outcome.saved_count(),
        path = %plugin.gateway().path().display(),
        "state flushed"
    );
    Ok(())
}
