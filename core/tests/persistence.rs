//! Debounced write-behind persistence.
//!
//! A burst of mutations produces one write after the quiet period. Write
//! failures never surface as errors; the store keeps working in memory.

use chrono::{Duration, NaiveDate};
use cruise_core::{
    clock::Clock,
    config::DeskConfig,
    model::{CasinoPerformance, Certificate, CertificateKind, Cruise},
    persistence::{decode_document, FileSink, MemorySink},
    store::{LoadOutcome, RecordStore},
};
use serde_json::json;

fn clock() -> Clock {
    Clock::fixed_on(NaiveDate::from_ymd_opt(2025, 6, 1).expect("date"))
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build_store(sink: &MemorySink) -> RecordStore {
    init_logging();
    RecordStore::with_clock(DeskConfig::default_test(), Box::new(sink.clone()), clock())
}

fn liberty(departure: &str) -> Cruise {
    Cruise::draft("Liberty of the Seas", departure, 7)
}

// ── Debounce ───────────────────────────────────────────────────────

#[test]
fn burst_of_mutations_writes_once() {
    let sink = MemorySink::new();
    let mut store = build_store(&sink);

    for departure in ["2025-07-01", "2025-08-01", "2025-09-01"] {
        store.create_cruise(liberty(departure)).expect("create");
        store.advance_clock(Duration::milliseconds(100));
    }
    assert!(!store.pump(), "deadline not reached yet");
    assert_eq!(sink.writes(), 0);

    store.advance_clock(Duration::milliseconds(500));
    assert!(store.pump());
    assert_eq!(sink.writes(), 1);
    assert!(!store.pump(), "nothing pending after the write");
    assert_eq!(sink.writes(), 1);

    let restored = decode_document(&sink.document().expect("document"), store.user_profile().clone())
        .expect("decode");
    assert_eq!(restored.cruises.len(), 3);
}

#[test]
fn each_mutation_pushes_the_deadline_out() {
    let sink = MemorySink::new();
    let mut store = build_store(&sink);

    store.create_cruise(liberty("2025-07-01")).expect("create");
    store.advance_clock(Duration::milliseconds(400));
    store.create_cruise(liberty("2025-08-01")).expect("create");
    store.advance_clock(Duration::milliseconds(400));
    assert!(!store.pump(), "second mutation restarted the window");

    store.advance_clock(Duration::milliseconds(100));
    assert!(store.pump());
    assert_eq!(sink.writes(), 1);
}

#[test]
fn flush_writes_pending_state_immediately() {
    let sink = MemorySink::new();
    let mut store = build_store(&sink);
    assert!(!store.flush(), "clean store has nothing to flush");

    store.create_cruise(liberty("2025-07-01")).expect("create");
    assert!(store.persistence_status().dirty);
    assert!(store.flush());
    assert_eq!(sink.writes(), 1);

    let status = store.persistence_status();
    assert!(!status.dirty);
    assert_eq!(status.due_at, None);
    assert_eq!(status.last_persist_at, Some(store.now()));
}

// ── Failure handling ───────────────────────────────────────────────

#[test]
fn failing_sink_switches_to_memory_only() {
    let sink = MemorySink::new();
    sink.set_failing(true);
    let mut store = build_store(&sink);

    let created = store.create_cruise(liberty("2025-07-01")).expect("mutation still succeeds");
    assert!(!store.flush());

    let status = store.persistence_status();
    assert!(status.memory_only);
    assert_eq!(status.write_attempts, 1);
    assert_eq!(status.writes_succeeded, 0);
    assert!(store.get_cruise(&created.id).is_some(), "state survives in memory");

    sink.set_failing(false);
    store.update_cruise(&created.id, |c| c.nights = 4).expect("update");
    store.advance_clock(Duration::seconds(1));
    assert!(store.pump());

    let status = store.persistence_status();
    assert!(!status.memory_only);
    assert_eq!(status.writes_succeeded, 1);
    assert_eq!(sink.writes(), 1);
}

// ── Load ───────────────────────────────────────────────────────────

#[test]
fn absent_document_needs_initial_import() {
    let sink = MemorySink::new();
    let mut store = build_store(&sink);
    assert_eq!(store.load(), LoadOutcome::NeedsInitialImport);
    assert!(store.state().cruises.is_empty());
}

#[test]
fn corrupt_document_needs_initial_import() {
    let sink = MemorySink::with_document("{ this is not json");
    let mut store = build_store(&sink);
    assert_eq!(store.load(), LoadOutcome::NeedsInitialImport);
    assert!(store.state().cruises.is_empty());
}

#[test]
fn undecodable_elements_are_skipped() {
    let sink = MemorySink::with_document(
        json!({
            "cruises": [
                { "id": "c1", "ship": "Liberty of the Seas", "departureDate": "2025-07-01", "nights": 7 },
                { "id": "c2", "ship": ["not", "a", "string"] }
            ],
            "casinoOffers": "not a list"
        })
        .to_string(),
    );
    let mut store = build_store(&sink);
    match store.load() {
        LoadOutcome::Restored(counts) => {
            assert_eq!(counts.cruises, 1);
            assert_eq!(counts.casino_offers, 0);
        }
        LoadOutcome::NeedsInitialImport => panic!("document should restore"),
    }
}

#[test]
fn load_repairs_are_not_written_back() {
    let sink = MemorySink::with_document(
        json!({
            "cruises": [{ "id": "c1", "ship": "Liberty of the Seas", "departureDate": "2025-07-01", "nights": 7 }]
        })
        .to_string(),
    );
    let mut store = build_store(&sink);
    assert!(matches!(store.load(), LoadOutcome::Restored(_)));
    assert_eq!(store.get_cruise("c1").expect("c1").return_date, "2025-07-08");

    assert!(!store.persistence_status().dirty);
    store.advance_clock(Duration::seconds(5));
    assert!(!store.pump());
    assert_eq!(sink.writes(), 0);
}

#[test]
fn file_sink_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("data").join("persist.json");
    let mut config = DeskConfig::default_test();
    config.persistence.path = path.clone();

    init_logging();
    let mut store = RecordStore::with_clock(config.clone(), Box::new(FileSink::new(&path)), clock());
    assert_eq!(store.load(), LoadOutcome::NeedsInitialImport);
    let created = store
        .create_cruise(Cruise {
            reservation_number: Some("R42".into()),
            ..liberty("2025-07-01")
        })
        .expect("create");
    store.update_user_profile(|p| p.points = 12_000);
    assert!(store.flush());
    assert!(path.exists());

    let mut reopened = RecordStore::with_clock(config, Box::new(FileSink::new(&path)), clock());
    match reopened.load() {
        LoadOutcome::Restored(counts) => assert_eq!(counts.cruises, 1),
        LoadOutcome::NeedsInitialImport => panic!("file should restore"),
    }
    let restored = reopened.get_cruise(&created.id).expect("same id after reload");
    assert_eq!(restored.booking_id.as_deref(), Some(created.id.as_str()));
    assert_eq!(restored.return_date, "2025-07-08");
    assert_eq!(reopened.user_profile().points, 12_000);
}

#[test]
fn certificates_and_casino_performance_survive_a_reload() {
    let sink = MemorySink::new();
    let mut store = build_store(&sink);
    store.create_certificate(Certificate {
        kind:       CertificateKind::Fcc,
        value:      450.0,
        expires_on: "2026-01-31".into(),
        ..Certificate::default()
    });
    store
        .upsert_casino_performance(CasinoPerformance {
            cruise_id:     "c1".into(),
            points_earned: 1_200,
            coin_in:       6_000.0,
            ..CasinoPerformance::default()
        })
        .expect("performance");
    assert!(store.flush());

    let document = sink.document().expect("document");
    assert!(document.contains("\"type\": \"FCC\""));

    let mut reopened = build_store(&sink);
    match reopened.load() {
        LoadOutcome::Restored(counts) => {
            assert_eq!(counts.certificates, 1);
            assert_eq!(counts.casino_performance, 1);
        }
        LoadOutcome::NeedsInitialImport => panic!("document should restore"),
    }
    assert_eq!(reopened.get_certificates()[0].kind, CertificateKind::Fcc);
    assert_eq!(reopened.casino_performance_for("c1").expect("c1").points_earned, 1_200);
}
