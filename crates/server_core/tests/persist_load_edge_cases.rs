use std::sync::Arc;

use data_runtime::document::PersistedDocument;
use server_core::{GatewayOptions, PersistenceGateway, VisibilityStore};

#[test]
fn missing_file_is_seeded_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("players.json");
    let store = Arc::new(VisibilityStore::new());
    let gw = PersistenceGateway::new(&path, Arc::clone(&store), GatewayOptions::default()).unwrap();

    assert_eq!(gw.load(), 0);
    assert!(path.exists());
    let doc = PersistedDocument::read(&path).unwrap();
    assert!(doc.players.as_ref().is_some_and(std::collections::BTreeMap::is_empty));
    let cfg = doc.config.unwrap();
    assert_eq!(cfg.invalidate_cooldown_ms, Some(150));
    assert_eq!(cfg.pickup_immediate, Some(true));
    assert!(!gw.is_dirty());
    gw.shutdown();
}

#[test]
fn malformed_file_loads_nothing_and_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("players.json");
    std::fs::write(&path, "{ not json").unwrap();
    let store = Arc::new(VisibilityStore::new());
    let gw = PersistenceGateway::new(&path, Arc::clone(&store), GatewayOptions::default()).unwrap();

    assert_eq!(gw.load(), 0);
    assert!(store.snapshot().is_empty());
    assert_eq!(gw.cfg().cooldown_ms(), 150);
    // left untouched for the operator to fix
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    gw.shutdown();
}
