//! Snapshot ring, rollback and guarded mutations.
//!
//! Rollback restores cruises, legacy bookings and offers exactly as they
//! were captured, and is itself reversible through the pre-rollback
//! snapshot it records.

use chrono::NaiveDate;
use cruise_core::{
    clock::Clock,
    config::DeskConfig,
    error::StoreError,
    model::{CasinoOffer, Cruise},
    persistence::MemorySink,
    snapshot::{GuardedOutcome, OperationType},
    store::RecordStore,
};

fn build_store_with(capacity: usize) -> RecordStore {
    let mut config = DeskConfig::default_test();
    config.snapshots.capacity = capacity;
    RecordStore::with_clock(
        config,
        Box::new(MemorySink::new()),
        Clock::fixed_on(NaiveDate::from_ymd_opt(2025, 6, 1).expect("date")),
    )
}

fn build_store() -> RecordStore {
    build_store_with(10)
}

/// Store seeded with five cruises and one offer; returns the cruise ids.
fn seeded(store: &mut RecordStore) -> Vec<String> {
    let ids: Vec<String> = (1..=5)
        .map(|month| {
            store
                .create_cruise(Cruise::draft("Wonder of the Seas", &format!("2025-{:02}-10", month + 6), 7))
                .expect("create")
                .id
        })
        .collect();
    store.create_casino_offer(CasinoOffer {
        offer_code:     "25AUG103".into(),
        offer_name:     "Balcony Getaway".into(),
        expires:        "2025-09-30".into(),
        trade_in_value: "$1,250".into(),
        ..CasinoOffer::default()
    });
    ids
}

// ── Scenario C: rollback after deletes ─────────────────────────────

#[test]
fn rollback_restores_deleted_cruises_exactly() {
    let mut store = build_store();
    let ids = seeded(&mut store);
    let before = store.state().cruises.clone();

    let snap = store.create_snapshot("Before cleanup", OperationType::ManualFix);
    for id in &ids[..3] {
        assert!(store.delete_cruise(id));
    }
    assert_eq!(store.state().cruises.len(), 2);

    let outcome = store.rollback_to(&snap).expect("rollback");
    assert!(outcome.success);
    assert_eq!(outcome.changes.cruises_restored, 5);
    assert_eq!(outcome.changes.offers_restored, 1);
    assert_eq!(store.state().cruises, before);
}

#[test]
fn rollback_is_itself_reversible() {
    let mut store = build_store();
    let ids = seeded(&mut store);

    let snap = store.create_snapshot("Before delete", OperationType::ManualFix);
    assert!(store.delete_cruise(&ids[0]));
    let after_delete = store.state().cruises.clone();

    let outcome = store.rollback_to(&snap).expect("rollback");
    assert_eq!(store.state().cruises.len(), 5);

    let pre = outcome.pre_rollback_snapshot_id.expect("pre-rollback snapshot");
    store.rollback_to(&pre).expect("undo rollback");
    assert_eq!(store.state().cruises, after_delete);
}

#[test]
fn snapshots_are_independent_copies() {
    let mut store = build_store();
    let ids = seeded(&mut store);
    let snap = store.create_snapshot("Before rename", OperationType::WebUpdate);

    store.update_cruise(&ids[0], |c| c.ship = "Icon of the Seas".into()).expect("update");
    let captured = store.snapshot(&snap).expect("snapshot");
    assert!(captured.cruises.iter().all(|c| c.ship == "Wonder of the Seas"));
}

#[test]
fn rollback_to_unknown_snapshot_fails() {
    let mut store = build_store();
    seeded(&mut store);
    let err = store.rollback_to("snapshot_0_missing").unwrap_err();
    assert!(matches!(err, StoreError::SnapshotNotFound { .. }));
    assert_eq!(store.state().cruises.len(), 5);
}

// ── Ring ───────────────────────────────────────────────────────────

#[test]
fn ring_evicts_oldest_beyond_capacity() {
    let mut store = build_store_with(3);
    let first = store.create_snapshot("one", OperationType::Import);
    for name in ["two", "three", "four"] {
        store.create_snapshot(name, OperationType::Import);
    }

    let listed = store.list_snapshots();
    assert_eq!(listed.len(), 3);
    assert!(store.snapshot(&first).is_none());
    let names: Vec<&str> = listed.iter().map(|s| s.description.as_str()).collect();
    assert_eq!(names, vec!["four", "three", "two"]);
}

#[test]
fn summaries_carry_collection_counts() {
    let mut store = build_store();
    seeded(&mut store);
    store.create_snapshot("counts", OperationType::Import);
    let summary = &store.list_snapshots()[0];
    assert_eq!(summary.cruise_count, 5);
    assert_eq!(summary.booked_count, 0);
    assert_eq!(summary.offer_count, 1);
    assert_eq!(summary.operation_type, OperationType::Import);
}

#[test]
fn delete_and_clear_snapshots() {
    let mut store = build_store();
    let a = store.create_snapshot("a", OperationType::ManualFix);
    store.create_snapshot("b", OperationType::ManualFix);

    assert!(store.delete_snapshot(&a));
    assert!(!store.delete_snapshot(&a));
    assert_eq!(store.clear_snapshots(), 1);
    assert!(store.list_snapshots().is_empty());
}

// ── Guarded mutations ──────────────────────────────────────────────

#[test]
fn guarded_success_commits() {
    let mut store = build_store();
    let ids = seeded(&mut store);

    let outcome = store.run_guarded("rename", |s| {
        s.update_cruise(&ids[0], |c| c.ship = "Icon of the Seas".into())
    });
    assert!(outcome.is_committed());
    assert!(store.snapshot(outcome.snapshot_id()).is_some());
    assert_eq!(store.get_cruise(&ids[0]).expect("cruise").ship, "Icon of the Seas");
}

#[test]
fn guarded_failure_rolls_back() {
    let mut store = build_store();
    let ids = seeded(&mut store);
    let before = store.state().cruises.clone();

    let outcome: GuardedOutcome<()> = store.run_guarded("delete then fail", |s| {
        s.delete_cruise(&ids[0]);
        s.delete_cruise(&ids[1]);
        Err("pricing source unavailable")
    });

    match &outcome {
        GuardedOutcome::RolledBack { error, rollback, .. } => {
            assert_eq!(error, "pricing source unavailable");
            assert!(rollback.success);
        }
        GuardedOutcome::Committed { .. } => panic!("should have rolled back"),
    }
    assert!(outcome.rollback_clean());
    assert_eq!(store.state().cruises, before);
}

#[test]
fn batch_abort_rolls_back_everything() {
    let mut store = build_store();
    let mut ids = seeded(&mut store);
    let before = store.state().cruises.clone();
    ids.insert(2, "missing-cruise".to_string());

    let outcome = store.run_batch_guarded("verify", &ids, false, |s, id| {
        s.update_cruise(id, |c| c.nights = 4)
    });

    assert!(!outcome.success);
    assert_eq!(outcome.successful, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome.errors[1].starts_with("Batch stopped due to error"));
    assert!(outcome.rollback.as_ref().is_some_and(|r| r.success));
    assert_eq!(store.state().cruises, before);
}

#[test]
fn batch_continue_on_error_keeps_partial_work() {
    let mut store = build_store();
    let mut ids = seeded(&mut store);
    ids.push("missing-cruise".to_string());

    let outcome = store.run_batch_guarded("verify", &ids, true, |s, id| {
        s.update_cruise(id, |c| c.nights = 4)
    });

    assert!(outcome.success);
    assert_eq!(outcome.processed, 6);
    assert_eq!(outcome.successful, 5);
    assert_eq!(outcome.failed, 1);
    assert!(outcome.rollback.is_none());
    assert!(store.state().cruises.iter().all(|c| c.nights == 4));
}

#[test]
fn empty_batch_reports_no_success() {
    let mut store = build_store();
    let outcome = store.run_batch_guarded("nothing", &[], false, |_, _| Ok::<(), String>(()));
    assert!(!outcome.success);
    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.failed, 0);
    assert!(outcome.rollback.is_none());
}
