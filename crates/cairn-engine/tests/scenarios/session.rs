use crate::*;

use anyhow::Result;
use cairn_core::wire::MIN_NOTIFICATION_LENGTH;
use cairn_engine::Strategy;

fn frame_id(frame: &[u8]) -> [u8; 32] {
    frame[1..33].try_into().expect("frame carries an id")
}

fn is_sentinel(frame: &[u8]) -> bool {
    frame.len() == MIN_NOTIFICATION_LENGTH && frame[0] == 0
}

/// Back-pressure mid-session: the driver suspends on the refused frame and
/// resumes from it — nothing sent twice, nothing skipped.
#[test]
fn backpressure_resumes_from_first_unsent() -> Result<()> {
    let mut a = engine(Strategy::Epidemic);
    let peer = cairn_core::Address::generate();
    for text in ["f1", "f2", "f3"] {
        a.send(text, &peer)?;
    }

    // the second send attempt is refused
    a.transport_mut().backpressure_at.insert(1);
    a.transmit_notifications();
    assert_eq!(a.transport().sent.len(), 1, "suspended after the refusal");

    // next readiness signal: the session resumes and drains fully
    a.transmit_notifications();
    let sent = a.transport_mut().sent.drain(..).collect::<Vec<_>>();
    assert_eq!(sent.len(), 4, "three data frames plus the sentinel");
    assert!(is_sentinel(&sent[3]));

    let ids: Vec<_> = sent[..3].iter().map(|f| frame_id(f)).collect();
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 3, "no frame was sent twice");
    Ok(())
}

/// A peer with nothing to offer still closes the session cleanly.
#[test]
fn sentinel_on_empty_store() {
    let mut a = engine(Strategy::Epidemic);
    let mut peer = engine(Strategy::Epidemic);

    let frames = drain_session(&mut a);
    assert_eq!(frames.len(), 1);
    assert!(is_sentinel(&frames[0]));

    deliver(&frames, &mut peer);
    assert_eq!(peer.transport().disconnects, 1);

    // the queue was cleared: the next session is another clean sentinel
    let frames = drain_session(&mut a);
    assert_eq!(frames.len(), 1);
    assert!(is_sentinel(&frames[0]));
}

/// A refused sentinel is retried on the next readiness signal without
/// re-sending the data frames.
#[test]
fn refused_sentinel_is_retried_alone() -> Result<()> {
    let mut a = engine(Strategy::Epidemic);
    a.send("cargo", &cairn_core::Address::generate())?;

    // attempt 0 is the data frame, attempt 1 the sentinel
    a.transport_mut().backpressure_at.insert(1);
    a.transmit_notifications();
    assert_eq!(a.transport().sent.len(), 1);
    assert!(!is_sentinel(&a.transport().sent[0]));

    a.transmit_notifications();
    let sent = a.transport_mut().sent.drain(..).collect::<Vec<_>>();
    assert_eq!(sent.len(), 2);
    assert!(is_sentinel(&sent[1]), "only the sentinel went out again");
    Ok(())
}

/// A dropped link discards the session; the next one rebuilds from the
/// store and re-offers everything.
#[test]
fn dropped_link_rebuilds_the_session() -> Result<()> {
    let mut a = engine(Strategy::Epidemic);
    let peer = cairn_core::Address::generate();
    a.send("f1", &peer)?;
    a.send("f2", &peer)?;

    a.transport_mut().backpressure_at.insert(1);
    a.transmit_notifications();
    assert_eq!(a.transport().sent.len(), 1);
    let first_id = frame_id(&a.transport().sent[0]);

    // the link drops; the partial session is forgotten
    a.session_closed();
    a.transport_mut().sent.clear();

    a.transmit_notifications();
    let sent = a.transport_mut().sent.drain(..).collect::<Vec<_>>();
    assert_eq!(sent.len(), 3, "both records re-offered, then the sentinel");
    assert!(sent[..2].iter().any(|f| frame_id(f) == first_id));
    Ok(())
}

/// Records that turn terminal mid-session are skipped, not transmitted.
#[test]
fn delivered_records_never_reenter_the_wire() -> Result<()> {
    let mut a = engine(Strategy::Epidemic);
    let mut b = engine(Strategy::Epidemic);
    let a_addr = a.address().clone();
    let b_addr = b.address().clone();

    // B holds a notification destined for A...
    let n = b.send("inbound", &a_addr)?;
    let frames = drain_session(&mut b);
    // ...which A receives (terminal in A's store)...
    deliver(&frames[..1], &mut a);
    assert_eq!(a.inbox().len(), 1);

    // ...and A also has something of its own to offer
    a.send("outbound", &b_addr)?;

    let sent = drain_session(&mut a);
    assert_eq!(sent.len(), 2, "one data frame plus the sentinel");
    assert_ne!(frame_id(&sent[0]), n.hashed_id, "the delivered record stays home");
    Ok(())
}

/// Every data frame respects the frame length bounds.
#[test]
fn frames_respect_length_bounds() -> Result<()> {
    let mut a = engine(Strategy::Epidemic);
    let peer = cairn_core::Address::generate();
    a.send("", &peer)?;
    a.send(&"x".repeat(a.max_message_length()), &peer)?;

    let sent = drain_session(&mut a);
    for frame in &sent {
        assert!(frame.len() >= MIN_NOTIFICATION_LENGTH);
        assert!(frame.len() <= MTU);
    }

    // one byte past the MTU is refused at creation
    let oversize = "x".repeat(a.max_message_length() + 1);
    assert!(a.send(&oversize, &peer).is_err());
    Ok(())
}
