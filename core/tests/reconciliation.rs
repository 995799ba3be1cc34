//! Reconciliation over loaded and imported data.
//!
//! Every pass must be idempotent: running it on already-clean data reports
//! zero fixes. The booking invariant holds for every cruise afterwards:
//! a non-empty reservation number ⟺ bookingId == id.

use chrono::NaiveDate;
use cruise_core::{
    clock::Clock,
    config::DeskConfig,
    model::{BookedCruise, Cruise, LifecycleStatus},
    persistence::MemorySink,
    store::{LoadOutcome, RecordStore},
};
use serde_json::json;

fn build_store_from(document: serde_json::Value) -> RecordStore {
    let sink = MemorySink::with_document(document.to_string());
    let mut store = RecordStore::with_clock(
        DeskConfig::default_test(),
        Box::new(sink),
        Clock::fixed_on(NaiveDate::from_ymd_opt(2025, 6, 1).expect("date")),
    );
    match store.load() {
        LoadOutcome::Restored(_) => store,
        LoadOutcome::NeedsInitialImport => panic!("document should restore"),
    }
}

fn assert_booking_invariant(store: &RecordStore) {
    for c in &store.state().cruises {
        if c.has_reservation() {
            assert_eq!(c.booking_id.as_deref(), Some(c.id.as_str()), "cruise {} lost its booking id", c.id);
        } else {
            assert_eq!(c.booking_id, None, "cruise {} has a stray booking id", c.id);
        }
    }
}

// ── Scenario A: return date from nights ────────────────────────────

#[test]
fn missing_return_date_is_derived_on_load() {
    let store = build_store_from(json!({
        "cruises": [{ "id": "c1", "ship": "Navigator of the Seas", "departureDate": "2025-03-01", "nights": 7 }]
    }));
    let c = store.get_cruise("c1").expect("cruise");
    assert_eq!(c.return_date, "2025-03-08");
}

#[test]
fn drifted_return_date_is_rewritten() {
    let store = build_store_from(json!({
        "cruises": [{
            "id": "c1",
            "ship": "Liberty of the Seas",
            "departureDate": "9/14/2025",
            "returnDate": "2025-09-30",
            "nights": 4
        }]
    }));
    let c = store.get_cruise("c1").expect("cruise");
    assert_eq!(c.departure_date, "2025-09-14");
    assert_eq!(c.return_date, "2025-09-18");
}

#[test]
fn nights_are_inferred_from_itinerary_text() {
    let store = build_store_from(json!({
        "cruises": [{
            "id": "c1",
            "ship": "Wonder of the Seas",
            "itineraryName": "5 Night Bahamas & Perfect Day",
            "departureDate": "2025-10-06"
        }]
    }));
    let c = store.get_cruise("c1").expect("cruise");
    assert_eq!(c.nights, 5);
    assert_eq!(c.return_date, "2025-10-11");
}

#[test]
fn unparseable_dates_are_left_alone() {
    let store = build_store_from(json!({
        "cruises": [{ "id": "c1", "ship": "Odyssey of the Seas", "departureDate": "TBD", "nights": 7 }]
    }));
    let c = store.get_cruise("c1").expect("cruise");
    assert_eq!(c.departure_date, "TBD");
    assert_eq!(c.return_date, "");
    assert_eq!(c.lifecycle_status, None);
}

// ── Scenario B: legacy promotion ───────────────────────────────────

#[test]
fn unmatched_legacy_booking_is_promoted_once() {
    let mut store = build_store_from(json!({
        "bookedCruises": [{
            "id": "b1",
            "ship": "Harmony of the Seas",
            "departureDate": "2025-11-02",
            "returnDate": "2025-11-09",
            "nights": 7,
            "reservationNumber": "R123",
            "guests": 2
        }]
    }));

    let promoted: Vec<&Cruise> = store
        .state()
        .cruises
        .iter()
        .filter(|c| c.reservation_number.as_deref() == Some("R123"))
        .collect();
    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].booking_id.as_deref(), Some(promoted[0].id.as_str()));
    assert_eq!(promoted[0].guests, Some(2));

    let again = store.fix_booking_ids();
    assert_eq!(again.promoted, 0);
    assert_eq!(store.state().cruises.len(), 1);
}

#[test]
fn matched_legacy_booking_is_not_duplicated() {
    let store = build_store_from(json!({
        "cruises": [{
            "id": "c1",
            "ship": "Harmony of the Seas",
            "departureDate": "2025-11-02",
            "nights": 7,
            "reservationNumber": "R123"
        }],
        "bookedCruises": [{
            "id": "b1",
            "ship": "Harmony of the Seas®",
            "departureDate": "11/02/2025",
            "nights": 7,
            "reservationNumber": "R123"
        }]
    }));
    assert_eq!(store.state().cruises.len(), 1);
    assert_booking_invariant(&store);
}

#[test]
fn stray_booking_fields_are_cleared() {
    let store = build_store_from(json!({
        "cruises": [
            { "id": "c1", "ship": "Liberty of the Seas", "departureDate": "2025-07-01", "nights": 7,
              "bookingId": "c1", "guests": 2, "daysToGo": 30 },
            { "id": "c2", "ship": "Liberty of the Seas", "departureDate": "2025-08-01", "nights": 7,
              "reservationNumber": "R9", "bookingId": "something-else" }
        ]
    }));
    assert_booking_invariant(&store);
    let c1 = store.get_cruise("c1").expect("c1");
    assert_eq!(c1.guests, None);
    assert_eq!(c1.days_to_go, None);
}

// ── Idempotence ────────────────────────────────────────────────────

#[test]
fn second_pass_reports_zero_fixes() {
    let mut store = build_store_from(json!({
        "cruises": [
            { "id": "c1", "ship": "Star of the Seas™", "departureDate": "8/30/2025", "nights": 7,
              "itineraryName": "7 Night  Eastern Caribbean [NEW]", "departurePort": "\"Port Canaveral\"" },
            { "id": "c2", "ship": "Liberty of the Seas", "departureDate": "2025-03-01", "nights": 3 }
        ],
        "bookedCruises": [
            { "id": "b1", "ship": "Allure of the Seas", "departureDate": "2025-12-14", "nights": 7,
              "reservationNumber": "R77" }
        ],
        "casinoOffers": [
            { "id": "o1", "offerCode": "25AUG103", "expires": "9/30/2025", "sailingDates": ["10/1/2025"] }
        ],
        "calendarEvents": [
            { "id": "e1", "summary": "Cruise  ™", "startDate": "7/1/2025", "endDate": "7/8/2025" }
        ],
        "financials": [
            { "id": "f1", "cruiseId": "c2", "itemDescription": "Casino Slot Play", "amount": 300 }
        ]
    }));

    let second = store.reconcile();
    assert_eq!(second.total(), 0, "second pass should be a no-op: {second:?}");
    assert_eq!(second.lifecycle, 0);

    let third = store.reconcile();
    assert_eq!(third.total(), 0);
    assert_booking_invariant(&store);
}

#[test]
fn reconcile_on_clean_data_schedules_no_write() {
    let mut store = build_store_from(json!({
        "cruises": [{ "id": "c1", "ship": "Liberty of the Seas", "departureDate": "2025-07-01", "nights": 7 }]
    }));
    store.flush();
    let report = store.reconcile();
    assert_eq!(report.total(), 0);
    assert!(!store.persistence_status().dirty);
}

// ── Lifecycle stamping ─────────────────────────────────────────────

#[test]
fn lifecycle_advances_with_the_clock() {
    let mut store = build_store_from(json!({
        "bookedCruises": [
            { "id": "b1", "ship": "Allure of the Seas", "departureDate": "2025-06-10", "nights": 7,
              "reservationNumber": "" }
        ]
    }));
    let stamped = store.state().booked_cruises[0].updated_at;
    assert_eq!(store.state().booked_cruises[0].lifecycle_status, Some(LifecycleStatus::Upcoming));

    store.advance_clock(chrono::Duration::days(10));
    store.reconcile();
    let b = &store.state().booked_cruises[0];
    assert_eq!(b.lifecycle_status, Some(LifecycleStatus::InProgress));
    assert!(b.updated_at > stamped);
}

#[test]
fn legacy_days_to_go_follow_today() {
    let mut store = build_store_from(json!({
        "bookedCruises": [
            { "id": "b1", "ship": "Allure of the Seas", "departureDate": "2025-06-21", "nights": 7,
              "daysToGo": 999 }
        ]
    }));
    let b: &BookedCruise = &store.state().booked_cruises[0];
    assert_eq!(b.days_to_go, 20);
    assert!(b.current_market_price.is_some());

    store.advance_clock(chrono::Duration::days(5));
    store.reconcile();
    assert_eq!(store.state().booked_cruises[0].days_to_go, 15);
}

#[test]
fn legacy_days_to_go_are_current_on_every_read() {
    let mut store = build_store_from(json!({ "cruises": [] }));
    let created = store.create_booked_cruise(BookedCruise {
        ship:               "Allure of the Seas".into(),
        departure_date:     "2025-06-11".into(),
        nights:             7,
        reservation_number: "R5".into(),
        ..BookedCruise::default()
    });
    assert_eq!(created.days_to_go, 10);

    store.advance_clock(chrono::Duration::days(5));
    let b = store.get_booked_cruise(&created.id).expect("booking");
    assert_eq!(b.days_to_go, 5);
    assert_eq!(store.get_legacy_booked_cruises()[0].days_to_go, 5);

    let moved = store
        .update_booked_cruise(&created.id, |b| b.departure_date = "2025-06-20".into())
        .expect("update");
    assert_eq!(moved.days_to_go, 14);
    assert_eq!(store.state().booked_cruises[0].days_to_go, 14);

    store.advance_clock(chrono::Duration::days(15));
    let sailing = store.get_booked_cruise(&created.id).expect("booking");
    assert_eq!(sailing.days_to_go, 0);
    assert_eq!(sailing.lifecycle_status, Some(LifecycleStatus::InProgress));
}

// ── Dirty input ────────────────────────────────────────────────────

#[test]
fn dirty_ship_name_still_matches_its_legacy_booking() {
    let store = build_store_from(json!({
        "cruises": [{
            "id": "c1",
            "ship": "Wonder of the Seas®",
            "departureDate": "2025-09-14",
            "nights": 7,
            "reservationNumber": "R1"
        }],
        "bookedCruises": [{
            "id": "b1",
            "ship": "Wonder of the Seas®",
            "departureDate": "2025-09-14",
            "nights": 7,
            "reservationNumber": "R1"
        }]
    }));
    let cruises = &store.state().cruises;
    assert_eq!(cruises.len(), 1, "no duplicate promoted: {cruises:?}");
    assert_eq!(cruises[0].id, "c1");
    assert_eq!(cruises[0].ship, "Wonder of the Seas");
    assert_booking_invariant(&store);
}

#[test]
fn dirty_input_reaches_a_fixed_point_after_load() {
    let mut store = build_store_from(json!({
        "cruises": [{
            "id": "c1",
            "ship": "Wonder of the Seas® [R]",
            "departureDate": "9/14/2025",
            "returnDate": "9/30/2025",
            "nights": 7,
            "reservationNumber": " R1 "
        }],
        "bookedCruises": [
            { "id": "b1", "ship": "Wonder of the Seas™", "departureDate": "09/14/2025", "nights": 7,
              "reservationNumber": "R1" },
            { "id": "b2", "ship": "Allure of the Seas®", "departureDate": "December 14, 2025", "nights": 7,
              "reservationNumber": "R2" }
        ]
    }));
    let loaded = store.state().cruises.len();
    assert_eq!(loaded, 2, "only the unmatched booking is promoted");
    let c1 = store.get_cruise("c1").expect("c1");
    assert_eq!(c1.departure_date, "2025-09-14");
    assert_eq!(c1.return_date, "2025-09-21");

    for pass in 0..2 {
        let report = store.reconcile();
        assert_eq!(report.total(), 0, "pass {pass} changed records: {report:?}");
        assert_eq!(report.booking.promoted, 0);
        assert_eq!(store.state().cruises.len(), loaded);
    }
    assert_booking_invariant(&store);
}
