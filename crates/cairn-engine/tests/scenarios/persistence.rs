use crate::*;

use anyhow::Result;
use cairn_engine::{AddressBook, Engine, SqliteStore, Strategy};

fn db_path(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("cairn-scenario-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("notifications.db")
}

fn sqlite_engine(path: &std::path::Path, strategy: Strategy) -> Result<Engine<TestLink>> {
    Ok(Engine::new(
        TestLink::default(),
        Box::new(SqliteStore::open(path)?),
        strategy,
        AddressBook::new(),
    )?)
}

/// The own address is generated once and reloaded on every restart.
#[test]
fn own_address_survives_restart() -> Result<()> {
    let path = db_path("own-address");

    let first = sqlite_engine(&path, Strategy::Epidemic)?;
    let address = first.address().clone();
    assert!(address.is_own);
    drop(first);

    let second = sqlite_engine(&path, Strategy::Epidemic)?;
    assert_eq!(second.address().value, address.value);
    assert_eq!(second.address().hashed, address.hashed);
    Ok(())
}

/// The receive set and inbox come back from the store, so duplicates stay
/// suppressed across restarts.
#[test]
fn receive_set_and_inbox_rebuilt_on_restart() -> Result<()> {
    let path = db_path("rebuild");

    let receiver = sqlite_engine(&path, Strategy::Epidemic)?;
    let receiver_addr = receiver.address().clone();
    drop(receiver);

    let mut sender = engine(Strategy::Epidemic);
    sender.send("survives restarts", &receiver_addr)?;
    let frames = drain_session(&mut sender);

    let mut receiver = sqlite_engine(&path, Strategy::Epidemic)?;
    deliver(&frames[..1], &mut receiver);
    assert_eq!(receiver.inbox().len(), 1);
    drop(receiver);

    let mut receiver = sqlite_engine(&path, Strategy::Epidemic)?;
    assert_eq!(receiver.inbox().len(), 1);
    assert_eq!(receiver.inbox()[0].message, "survives restarts");
    assert_eq!(receiver.received_hashed_ids().len(), 1);

    // re-delivery after restart is still a duplicate
    deliver(&frames[..1], &mut receiver);
    assert_eq!(receiver.inbox().len(), 1);
    Ok(())
}
