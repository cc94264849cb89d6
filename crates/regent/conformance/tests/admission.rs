//! Capacity properties exercised through the assembled engine.

use regent_capacity::{AdmissionOutcome, ClaimId, ResourceId};
use regent_conformance::{engine_with_run, fixed_now, stored_enrollment};
use regent_engine::{CapacityResolution, MutationRequest};
use regent_types::{ActorId, RecordData, Role};
use std::sync::Arc;
use std::thread;

fn confirm_patch() -> RecordData {
    let mut patch = RecordData::new();
    patch.set("status", "confirmed");
    patch
}

#[test]
fn concurrent_confirmations_fill_seats_exactly_once() {
    let max = 6u32;
    let extra = 5u32;
    let engine = engine_with_run("run-1", max);

    let handles: Vec<_> = (0..max + extra)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let record = stored_enrollment(&format!("enr-{i}"), "run-1", "pending");
                engine
                    .authorize_and_apply_at(
                        MutationRequest::update(
                            Role::Manager,
                            Some(ActorId::new("mgr-1")),
                            record,
                            confirm_patch(),
                        ),
                        fixed_now(),
                    )
                    .unwrap()
            })
        })
        .collect();

    let approved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let seats = approved
        .iter()
        .filter(|a| matches!(a.capacity, Some(CapacityResolution::Admitted { .. })))
        .count();
    let mut positions: Vec<u32> = approved
        .iter()
        .filter_map(|a| match &a.capacity {
            Some(CapacityResolution::Waitlisted { position, .. }) => Some(*position),
            _ => None,
        })
        .collect();
    positions.sort_unstable();

    assert_eq!(seats, max as usize);
    assert_eq!(positions, (1..=extra).collect::<Vec<_>>());

    let snapshot = engine
        .ledgers()
        .snapshot(&ResourceId::new("run-1"))
        .unwrap();
    assert_eq!(snapshot.committed, max);
    assert_eq!(snapshot.waitlist.len(), extra as usize);
}

#[test]
fn release_promotes_head_and_empties_waitlist() {
    let engine = engine_with_run("run-1", 2);

    // A and B take the seats, C waits at position 1.
    for (id, waitlisted) in [("enr-a", false), ("enr-b", false), ("enr-c", true)] {
        let approved = engine
            .authorize_and_apply_at(
                MutationRequest::update(
                    Role::Manager,
                    Some(ActorId::new("mgr-1")),
                    stored_enrollment(id, "run-1", "pending"),
                    confirm_patch(),
                ),
                fixed_now(),
            )
            .unwrap();
        match (&approved.capacity, waitlisted) {
            (Some(CapacityResolution::Admitted { .. }), false) => {}
            (Some(CapacityResolution::Waitlisted { position, .. }), true) => {
                assert_eq!(*position, 1);
            }
            other => panic!("unexpected capacity outcome: {other:?}"),
        }
    }

    // Releasing A promotes C; the waitlist drains.
    let mut cancel = RecordData::new();
    cancel.set("status", "cancelled");
    let approved = engine
        .authorize_and_apply_at(
            MutationRequest::update(
                Role::Manager,
                Some(ActorId::new("mgr-1")),
                stored_enrollment("enr-a", "run-1", "confirmed"),
                cancel,
            ),
            fixed_now(),
        )
        .unwrap();
    match approved.capacity {
        Some(CapacityResolution::Released { promoted, .. }) => {
            assert_eq!(promoted, Some(ClaimId::new("enr-c")));
        }
        other => panic!("expected release, got {other:?}"),
    }

    let snapshot = engine
        .ledgers()
        .snapshot(&ResourceId::new("run-1"))
        .unwrap();
    assert_eq!(snapshot.committed, 2);
    assert!(snapshot.waitlist.is_empty());
}

#[test]
fn admission_replay_is_stable_and_counts_once() {
    let engine = engine_with_run("run-1", 3);
    let resource = ResourceId::new("run-1");
    let claim = ClaimId::new("claim-1");

    let first = engine
        .ledgers()
        .request_admission(&resource, &claim)
        .unwrap();
    let second = engine
        .ledgers()
        .request_admission(&resource, &claim)
        .unwrap();

    assert_eq!(first.outcome, AdmissionOutcome::Committed);
    assert_eq!(second.outcome, AdmissionOutcome::Committed);
    assert!(!first.replayed);
    assert!(second.replayed);

    let snapshot = engine.ledgers().snapshot(&resource).unwrap();
    assert_eq!(snapshot.committed, 1);
}

#[test]
fn deleting_a_confirmed_enrollment_frees_its_seat() {
    let engine = engine_with_run("run-1", 1);

    engine
        .authorize_and_apply_at(
            MutationRequest::update(
                Role::Manager,
                Some(ActorId::new("mgr-1")),
                stored_enrollment("enr-a", "run-1", "pending"),
                confirm_patch(),
            ),
            fixed_now(),
        )
        .unwrap();

    let approved = engine
        .authorize_and_apply_at(
            MutationRequest::delete(
                Role::Admin,
                Some(ActorId::new("adm-1")),
                stored_enrollment("enr-a", "run-1", "confirmed"),
            ),
            fixed_now(),
        )
        .unwrap();
    assert!(matches!(
        approved.capacity,
        Some(CapacityResolution::Released { .. })
    ));

    let snapshot = engine
        .ledgers()
        .snapshot(&ResourceId::new("run-1"))
        .unwrap();
    assert_eq!(snapshot.committed, 0);
}
