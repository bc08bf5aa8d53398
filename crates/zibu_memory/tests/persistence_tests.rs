//! SQLite-backed persistence, end to end.

use std::sync::Arc;
use tempfile::TempDir;
use zibu_core::{ByteStore, LinearDecay, NeedsSnapshot, NeedsState};
use zibu_memory::{PersistWriter, PersistenceGateway, SqliteStore};

async fn open(dir: &TempDir) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::new(dir.path().join("zibu.db")).await.unwrap())
}

#[tokio::test]
async fn test_snapshot_wire_format() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let gw = PersistenceGateway::new(store.clone(), "zibu_state");

    let needs = NeedsState {
        mood: 0.25,
        hunger: 0.5,
        clean: 0.75,
        rest: 1.0,
    };
    assert!(gw.save(&NeedsSnapshot::new(needs, 1_700_000_000_000)).await);

    let raw = store.get("zibu_state").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(json["lastUpdated"], 1_700_000_000_000i64);
    assert_eq!(json["needs"]["mood"], 0.25);
    assert_eq!(json["needs"]["hunger"], 0.5);
    assert_eq!(json["needs"]["clean"], 0.75);
    assert_eq!(json["needs"]["rest"], 1.0);
}

#[tokio::test]
async fn test_restore_after_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let gw = PersistenceGateway::new(open(&dir).await, "zibu_state");
        gw.save(&NeedsSnapshot::new(NeedsState::uniform(0.8), 0))
            .await;
    }

    let gw = PersistenceGateway::new(open(&dir).await, "zibu_state");
    // Ten minutes offline: two heartbeats worth of decay.
    let (needs, snap) = gw.restore(&LinearDecay::default(), 600_000).await;
    assert_eq!(snap.map(|s| s.last_updated), Some(0));
    for (_, value) in needs.iter() {
        assert!((value - 0.78).abs() < 1e-5);
    }
}

#[tokio::test]
async fn test_out_of_range_values_are_clamped_on_load() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    store
        .set(
            "zibu_state",
            br#"{"needs":{"mood":1.7,"hunger":-0.2,"clean":0.5,"rest":0.5},"lastUpdated":5}"#,
        )
        .await
        .unwrap();

    let gw = PersistenceGateway::new(store, "zibu_state");
    let snap = gw.load().await.unwrap();
    assert_eq!(snap.needs.mood, 1.0);
    assert_eq!(snap.needs.hunger, 0.0);
    assert_eq!(snap.last_updated, 5);
}

#[tokio::test]
async fn test_writer_persists_latest_to_sqlite() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let (writer, handle) = PersistWriter::spawn(PersistenceGateway::new(store.clone(), "k"));

    for i in 0..10 {
        writer.save(NeedsSnapshot::new(NeedsState::uniform(i as f32 / 10.0), i));
    }
    drop(writer);
    handle.await.unwrap();

    let gw = PersistenceGateway::new(store, "k");
    let latest = gw.load().await.unwrap();
    assert_eq!(latest.last_updated, 9);
    assert!((latest.needs.rest - 0.9).abs() < 1e-6);
}
