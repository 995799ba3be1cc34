//! Casino ROI, value score and forecasting over a seeded store.

use chrono::NaiveDate;
use cruise_core::{
    casino_analytics::{self, CompInput},
    clock::Clock,
    config::DeskConfig,
    error::StoreError,
    model::{CasinoOffer, Cruise, FinancialsRecord},
    paytable,
    persistence::MemorySink,
    predictive::{self, ScenarioRequest, TierForecast},
    store::RecordStore,
    value_score::{self, Recommendation, WEIGHTS},
};

fn build_store() -> RecordStore {
    RecordStore::with_clock(
        DeskConfig::default_test(),
        Box::new(MemorySink::new()),
        Clock::fixed_on(NaiveDate::from_ymd_opt(2025, 6, 1).expect("date")),
    )
}

fn cruise(ship: &str, departure: &str, nights: i64) -> Cruise {
    Cruise {
        departure_port: "Galveston, Texas".into(),
        ..Cruise::draft(ship, departure, nights)
    }
}

fn casino_line(cruise_id: &str, amount: f64) -> FinancialsRecord {
    FinancialsRecord {
        cruise_id:        cruise_id.into(),
        item_description: Some("Casino Slot Play".into()),
        amount:           Some(amount),
        ..FinancialsRecord::default()
    }
}

/// Two sailed cruises with casino play and one future reservation.
fn store_with_history() -> (RecordStore, Vec<String>) {
    let mut store = build_store();
    let a = store.create_cruise(cruise("Navigator of the Seas", "2025-01-10", 7)).expect("a").id;
    let b = store.create_cruise(cruise("Liberty of the Seas", "2025-03-03", 4)).expect("b").id;
    let booked = store
        .create_cruise(Cruise {
            reservation_number: Some("R100".into()),
            ..cruise("Harmony of the Seas", "2025-10-12", 7)
        })
        .expect("booked")
        .id;
    store.add_financials(vec![casino_line(&a, 2_000.0), casino_line(&b, 1_000.0)]);
    (store, vec![a, b, booked])
}

// ── Scenario D: pay table ──────────────────────────────────────────

#[test]
fn nine_thousand_points_resolve_to_2502a02a() {
    let tier = paytable::tier_for_points(9_000).expect("tier");
    assert_eq!(tier.offer_code, "2502A02A");

    let a = casino_analytics::compute(&CompInput {
        cruise_id:   "c1".into(),
        cabin_price: 2_000.0,
        taxes:       300.0,
        points:      9_000,
        ..CompInput::default()
    });
    assert_eq!(a.reward_tier, tier.reward);
    assert_eq!(a.next_cruise_bonus, "$1,000 FreePlay");
    assert_eq!(a.retail_value, 2_300.0);
    assert_eq!(a.savings, 1_300.0);
    assert_eq!(a.out_of_pocket, 1_000.0);
    assert_eq!(a.coin_in, 45_000.0);
    assert!((a.roi - (1_300.0 - 45_000.0) / 45_000.0 * 100.0).abs() < 1e-9);
}

#[test]
fn perks_add_to_total_value() {
    let a = casino_analytics::compute(&CompInput {
        cabin_price: 500.0,
        taxes:       75.0,
        perks:       vec!["Wifi package".into(), "$100 Free Play".into()],
        points:      400,
        ..CompInput::default()
    });
    assert_eq!(a.savings, 475.0);
    assert_eq!(a.total_value, 475.0 + 200.0);
}

#[test]
fn analytics_cache_upserts_per_cruise() {
    let mut store = build_store();
    let input = CompInput { cruise_id: "c1".into(), cabin_price: 1_000.0, taxes: 150.0, points: 2_000, ..CompInput::default() };
    let first = casino_analytics::calculate_casino_analytics(&mut store, input.clone());
    let second = casino_analytics::calculate_casino_analytics(&mut store, CompInput { points: 4_000, ..input });

    assert_eq!(store.all_casino_analytics().len(), 1);
    assert_eq!(second.id, first.id);
    assert_eq!(store.casino_analytics_for("c1")[0].points, 4_000);
}

#[test]
fn offer_analysis_skips_expired_offers() {
    let mut store = build_store();
    let id = store.create_cruise(cruise("Navigator of the Seas", "2025-09-01", 7)).expect("create").id;
    for (code, expires) in [("OLD", "2025-05-01"), ("NEW", "2025-12-31")] {
        store.create_casino_offer(CasinoOffer {
            offer_code: code.into(),
            offer_name: "Dining package".into(),
            expires:    expires.into(),
            ..CasinoOffer::default()
        });
    }

    let analyses = casino_analytics::generate_offer_analysis(&mut store, &id).expect("analysis");
    assert_eq!(analyses.len(), 1);
    assert!(analyses[0].comparison.market_price > 0.0);
    assert!(!analyses[0].recommendations.is_empty());
    assert_eq!(store.casino_analytics_for(&id).len(), 1);

    let summary = casino_analytics::cruise_casino_summary(&mut store, &id).expect("summary");
    assert!(summary.best_offer.is_some());
    assert_eq!(store.all_casino_analytics().len(), 1);
}

#[test]
fn offer_analysis_of_missing_cruise_is_not_found() {
    let mut store = build_store();
    let err = casino_analytics::generate_offer_analysis(&mut store, "nope").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

// ── Value score ────────────────────────────────────────────────────

#[test]
fn weights_sum_to_one() {
    assert!((WEIGHTS.sum() - 1.0).abs() < 1e-12);
}

#[test]
fn scores_stay_in_range() {
    let (mut store, ids) = store_with_history();
    store.create_casino_offer(CasinoOffer {
        trade_in_value: "$99,999".into(),
        sailing_dates:  vec!["2025-10-12".into()],
        ..CasinoOffer::default()
    });
    casino_analytics::calculate_casino_analytics(
        &mut store,
        CompInput { cruise_id: ids[0].clone(), cabin_price: 50_000.0, points: 400, ..CompInput::default() },
    );

    let report = value_score::cruise_value_scores(&store, None);
    assert_eq!(report.summary.total_cruises_scored, 3);
    for s in &report.scores {
        assert!(s.total_score <= 100);
        for f in [
            s.factors.roi_score,
            s.factors.offer_value_score,
            s.factors.ship_profitability_score,
            s.factors.schedule_score,
            s.factors.port_distance_score,
            s.factors.cabin_match_score,
            s.factors.pricing_score,
        ] {
            assert!((0.0..=100.0).contains(&f), "factor out of range: {f}");
        }
    }
    assert!(report.scores.windows(2).all(|w| w[0].total_score >= w[1].total_score));
}

#[test]
fn overlapping_booking_forces_schedule_to_zero() {
    let (mut store, ids) = store_with_history();
    let clash = store.create_cruise(cruise("Wonder of the Seas", "2025-10-15", 4)).expect("clash");
    let clear = store.create_cruise(cruise("Wonder of the Seas", "2025-11-01", 4)).expect("clear");

    let s = value_score::score_cruise(&store, &store.get_cruise(&clash.id).expect("clash"));
    assert_eq!(s.factors.schedule_score, 0.0);
    assert_ne!(s.recommendation, Recommendation::Excellent);
    assert!(s.insights.iter().any(|i| i.contains("Schedule conflict")));

    let ok = value_score::score_cruise(&store, &store.get_cruise(&clear.id).expect("clear"));
    assert_eq!(ok.factors.schedule_score, 100.0);

    let own = value_score::score_cruise(&store, &store.get_cruise(&ids[2]).expect("booked"));
    assert_eq!(own.factors.schedule_score, 100.0, "a booking never conflicts with itself");
}

#[test]
fn report_can_be_limited_to_ids() {
    let (store, ids) = store_with_history();
    let report = value_score::cruise_value_scores(&store, Some(&ids[..1]));
    assert_eq!(report.scores.len(), 1);
    assert_eq!(report.scores[0].cruise_id, ids[0]);
}

// ── Forecasting ────────────────────────────────────────────────────

#[test]
fn history_comes_from_casino_spend() {
    let (store, ids) = store_with_history();
    let history = predictive::historical_cruises(&store);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].cruise_id, ids[0]);
    assert_eq!(history[0].points, 400);
    assert_eq!(history[1].points, 200);

    let b = predictive::baseline(&history);
    assert_eq!(b.avg_coin_in_per_cruise, 1_500.0);
    assert_eq!(b.avg_points_per_cruise, 300.0);
}

#[test]
fn same_seed_same_report() {
    let (store, _) = store_with_history();
    let first = predictive::predictive_report(&store);
    let second = predictive::predictive_report(&store);
    assert_eq!(first, second);

    let (other, _) = store_with_history();
    assert_eq!(predictive::predictive_report(&other).risk_band, first.risk_band);
    assert_eq!(first.roi_projections.len(), 4);
    assert_eq!(first.risk_band.simulation_count, 1_000);
}

#[test]
fn tier_forecast_uses_average_points() {
    let (store, _) = store_with_history();
    match predictive::predictive_report(&store).tier_forecast {
        Some(TierForecast::Progress { points_needed, cruises_needed, next_tier_points, .. }) => {
            assert_eq!(next_tier_points, 25_000);
            assert_eq!(points_needed, 4_280);
            assert_eq!(cruises_needed, 15);
        }
        other => panic!("unexpected forecast: {other:?}"),
    }
}

#[test]
fn scenario_validation() {
    let (store, _) = store_with_history();
    let bad = [
        ScenarioRequest { future_cruises: 0, ..ScenarioRequest::default() },
        ScenarioRequest { future_cruises: 51, ..ScenarioRequest::default() },
        ScenarioRequest { future_cruises: 3, avg_coin_in: Some(-1.0), ..ScenarioRequest::default() },
        ScenarioRequest { future_cruises: 3, target_tier: Some("Platinum Yacht".into()), ..ScenarioRequest::default() },
    ];
    for request in &bad {
        let err = predictive::simulate_scenario(&store, request).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)), "{request:?} should be rejected");
    }
}

#[test]
fn scenario_reaches_target_tier() {
    let (store, _) = store_with_history();
    let result = predictive::simulate_scenario(
        &store,
        &ScenarioRequest { future_cruises: 3, avg_coin_in: Some(10_000.0), target_tier: Some("2502A01".into()) },
    )
    .expect("scenario");

    assert_eq!(result.points_per_cruise, 2_000);
    assert_eq!(result.projection.projected_points, 26_720.0);
    let target = result.target.expect("target");
    assert_eq!(target.points_needed, 4_280);
    assert_eq!(target.cruises_needed, 3);
    assert_eq!(target.spend_needed, 21_400.0);
    assert!(target.achievable);
}

#[test]
fn player_context_totals() {
    let (store, _) = store_with_history();
    let ctx = predictive::player_context(&store);
    assert_eq!(ctx.total_coin_in, 3_000.0);
    assert_eq!(ctx.total_points, 600);
    assert_eq!(ctx.cruises_completed, 2);
    assert_eq!(ctx.booked_cruises, 1);
    assert_eq!(ctx.current_points, 20_720);
    assert!((ctx.points_per_day - 600.0 / 11.0).abs() < 1e-9);
    assert!((ctx.points_per_sea_day - 100.0).abs() < 1e-9);
    assert!((ctx.points_per_port_day - 120.0).abs() < 1e-9);
}
