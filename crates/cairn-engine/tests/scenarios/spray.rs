use crate::*;

use anyhow::Result;
use cairn_core::wire::{ControlByte, DestinationControl};
use cairn_engine::{EngineError, Strategy};

fn wire_control(frame: &[u8]) -> ControlByte {
    ControlByte::unpack(frame[0]).expect("valid control byte on the wire")
}

/// The literal halving walk: L=4, three encounters, then the wait phase.
#[test]
fn spray_halving_across_encounters() -> Result<()> {
    let mut a = engine(Strategy::SprayAndWait { copies: 4 });
    let destination = cairn_core::Address::generate();
    let n = a.send("beacon", &destination)?;

    // encounter B: half the budget is offered on the wire
    let mut b = engine(Strategy::SprayAndWait { copies: 4 });
    let frames = drain_session(&mut a);
    let control = wire_control(&frames[0]);
    assert_eq!(control.destination_control(), DestinationControl::Flood);
    assert_eq!(control.sequence_number(), 2);

    // the stored record is untouched until B acknowledges
    let stored = a.store().fetch_by_hashed_id(&n.hashed_id)?.expect("stored");
    assert_eq!(stored.control.sequence_number(), 4);

    deliver(&frames[..1], &mut b);
    assert_eq!(b.transport().acks, vec![n.hashed_id]);
    let b_copy = b.store().fetch_by_hashed_id(&n.hashed_id)?.expect("B holds a copy");
    assert_eq!(b_copy.control.sequence_number(), 2);

    assert!(a.receive_acknowledgement(&n.hashed_id));
    let stored = a.store().fetch_by_hashed_id(&n.hashed_id)?.expect("stored");
    assert_eq!(stored.control.sequence_number(), 2);

    // encounter C: one copy offered
    let frames = drain_session(&mut a);
    let control = wire_control(&frames[0]);
    assert_eq!(control.destination_control(), DestinationControl::Flood);
    assert_eq!(control.sequence_number(), 1);
    assert!(a.receive_acknowledgement(&n.hashed_id));
    let stored = a.store().fetch_by_hashed_id(&n.hashed_id)?.expect("stored");
    assert_eq!(stored.control.sequence_number(), 1);

    // encounter D: the budget cannot halve, so this hop goes out direct-only
    let frames = drain_session(&mut a);
    let control = wire_control(&frames[0]);
    assert_eq!(control.destination_control(), DestinationControl::DirectOnly);
    assert_eq!(control.sequence_number(), 1);

    // D's ack pushes the stored record into the wait phase
    assert!(a.receive_acknowledgement(&n.hashed_id));
    let stored = a.store().fetch_by_hashed_id(&n.hashed_id)?.expect("stored");
    assert_eq!(
        stored.control.destination_control(),
        DestinationControl::DirectOnly
    );
    assert_eq!(stored.control.sequence_number(), 1);
    Ok(())
}

/// A spray frame that reaches its destination is delivered and acknowledged.
#[test]
fn spray_delivery_acknowledges() -> Result<()> {
    let mut a = engine(Strategy::SprayAndWait { copies: 2 });
    let mut b = engine(Strategy::SprayAndWait { copies: 2 });
    let b_addr = b.address().clone();

    let n = a.send("direct hit", &b_addr)?;
    let frames = drain_session(&mut a);

    deliver(&frames[..1], &mut b);
    assert_eq!(b.inbox().len(), 1);
    assert_eq!(b.transport().acks, vec![n.hashed_id]);
    Ok(())
}

/// A wait-phase frame (direct-only) is refused by everyone except the
/// destination.
#[test]
fn wait_phase_frame_ignored_by_bystanders() -> Result<()> {
    let mut a = engine(Strategy::SprayAndWait { copies: 1 });
    let mut bystander = engine(Strategy::SprayAndWait { copies: 1 });
    let destination = cairn_core::Address::generate();

    a.send("hold for delivery", &destination)?;
    let frames = drain_session(&mut a);
    assert_eq!(
        wire_control(&frames[0]).destination_control(),
        DestinationControl::DirectOnly
    );

    deliver(&frames[..1], &mut bystander);
    assert!(bystander.received_hashed_ids().is_empty());
    assert!(bystander.transport().acks.is_empty());
    Ok(())
}

#[test]
fn acknowledgement_for_unknown_notification_is_dropped() {
    let mut a = engine(Strategy::SprayAndWait { copies: 4 });
    assert!(!a.receive_acknowledgement(&[0xee; 32]));
}

#[test]
fn malformed_acknowledgement_is_dropped() -> Result<()> {
    let mut a = engine(Strategy::SprayAndWait { copies: 4 });
    let n = a.send("x", &cairn_core::Address::generate())?;
    assert!(!a.receive_acknowledgement(&n.hashed_id[..31]));

    let mut long = n.hashed_id.to_vec();
    long.push(0);
    assert!(!a.receive_acknowledgement(&long));
    Ok(())
}

/// Only spray-and-wait understands acknowledgements.
#[test]
fn other_strategies_refuse_acknowledgements() -> Result<()> {
    let mut direct = engine(Strategy::Direct);
    let n = direct.send("no acks", &cairn_core::Address::generate())?;
    assert!(!direct.receive_acknowledgement(&n.hashed_id));

    let mut epidemic = engine(Strategy::Epidemic);
    let n = epidemic.send("still no acks", &cairn_core::Address::generate())?;
    assert!(!epidemic.receive_acknowledgement(&n.hashed_id));
    Ok(())
}

#[test]
fn copy_budget_bounds() {
    let mut a = engine(Strategy::SprayAndWait { copies: 4 });
    assert!(a.set_number_of_copies(15).is_ok());
    assert!(a.set_number_of_copies(16).is_err());
    assert!(a.set_number_of_copies(0).is_err());

    let mut epidemic = engine(Strategy::Epidemic);
    assert!(matches!(
        epidemic.set_number_of_copies(4),
        Err(EngineError::RequiresSprayAndWait)
    ));
}

/// The new budget applies to notifications created afterwards.
#[test]
fn copy_budget_applies_to_new_notifications() -> Result<()> {
    let mut a = engine(Strategy::SprayAndWait { copies: 4 });
    a.set_number_of_copies(15)?;
    let n = a.send("wide spray", &cairn_core::Address::generate())?;
    assert_eq!(n.control.sequence_number(), 15);
    Ok(())
}
