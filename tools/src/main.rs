//! cruise-runner: headless host for the cruise record store.
//!
//! Usage:
//!   cruise-runner --config desk.json --data DATA/persist.json
//!   cruise-runner --import rows.json --scores --forecast
//!   cruise-runner --scenario 5 --coin-in 8000 --target 2502A01

use anyhow::{Context, Result};
use cruise_core::{
    config::DeskConfig,
    import::{ImportBatch, ImportOutcome},
    predictive::{self, ScenarioRequest, TierForecast},
    store::{LoadOutcome, RecordStore},
    value_score,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => DeskConfig::load(path)?,
        None => DeskConfig::default(),
    };
    if let Some(path) = flag_value(&args, "--data") {
        config.persistence.path = path.into();
    }
    let import_path = flag_value(&args, "--import");
    let show_scores = args.iter().any(|a| a == "--scores");
    let show_forecast = args.iter().any(|a| a == "--forecast");
    let scenario_cruises = parse_arg(&args, "--scenario", 0u32);

    println!("Cruise desk - cruise-runner");
    println!("  data:      {}", config.persistence.path.display());
    println!("  import:    {}", import_path.unwrap_or("-"));
    println!("  seed:      {}", config.analytics.forecast_seed);
    println!();

    let mut store = RecordStore::open(config);
    match store.load() {
        LoadOutcome::Restored(counts) => {
            println!("Restored {} cruises, {} offers, {} events", counts.cruises, counts.casino_offers, counts.calendar_events);
        }
        LoadOutcome::NeedsInitialImport if import_path.is_none() => {
            println!("No persisted data. Pass --import <rows.json> to seed the store.");
        }
        LoadOutcome::NeedsInitialImport => {}
    }

    if let Some(path) = import_path {
        run_import(&mut store, path)?;
    }

    print_summary(&store);
    if show_scores {
        print_scores(&store);
    }
    if show_forecast {
        print_forecast(&store);
    }
    if scenario_cruises > 0 {
        let request = ScenarioRequest {
            future_cruises: scenario_cruises,
            avg_coin_in:    flag_value(&args, "--coin-in").and_then(|v| v.parse().ok()),
            target_tier:    flag_value(&args, "--target").map(String::from),
        };
        print_scenario(&store, &request)?;
    }

    if store.flush() {
        log::info!("runner: state written to {}", store.persistence_status().target);
    } else if store.persistence_status().memory_only {
        log::warn!("runner: persistence unavailable, changes kept in memory only");
    }
    Ok(())
}

fn run_import(store: &mut RecordStore, path: &str) -> Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    let batch: ImportBatch = serde_json::from_str(&text).with_context(|| format!("Cannot parse {path}"))?;
    let summary = store.import_batch(&batch);

    println!("=== IMPORT ===");
    for (sheet, outcome) in [
        ("cruises", &summary.cruises),
        ("booked", &summary.booked),
        ("offers", &summary.offers),
        ("calendar", &summary.events),
    ] {
        print_import_line(sheet, outcome);
    }
    println!();
    Ok(())
}

fn print_import_line(sheet: &str, outcome: &ImportOutcome) {
    println!(
        "  {sheet:<9} created: {:<4} rejected: {:<3} promoted: {}",
        outcome.created,
        outcome.errors.len(),
        outcome.booking.promoted
    );
    for e in &outcome.errors {
        println!("    - {}", e.message);
    }
}

fn print_summary(store: &RecordStore) {
    let stats = store.stats();
    let counts = store.state().counts();
    let savings = store.savings_summary();
    let profile = store.user_profile();

    println!("=== STORE SUMMARY ===");
    println!("  cruises:         {} ({} booked, {} available)", stats.total_cruises, stats.booked_cruises, stats.available_cruises);
    println!("  legacy bookings: {}", counts.booked_cruises);
    println!("  casino offers:   {}", stats.casino_offers);
    println!("  calendar events: {}", stats.calendar_events);
    println!("  financial lines: {}", counts.financials);
    println!("  certificates:    {} ({} usable)", counts.certificates, store.usable_certificates().len());
    println!("  loyalty:         {} ({} points)", profile.level, profile.points);
    println!("  actual savings:  ${:.0}", savings.total_actual_savings);
    println!("  paid fares:      ${:.0}", savings.total_paid);
    match store.last_import() {
        Some(at) => println!("  last import:     {}", at.to_rfc3339()),
        None => println!("  last import:     never"),
    }
    println!();
}

fn print_scores(store: &RecordStore) {
    let report = value_score::cruise_value_scores(store, None);
    let s = &report.summary;
    println!("=== VALUE SCORES ===");
    println!(
        "  scored: {} | excellent {} | good {} | fair {} | poor {} | average {}",
        s.total_cruises_scored, s.excellent_count, s.good_count, s.fair_count, s.poor_count, s.average_score
    );
    if s.top_cruises.is_empty() {
        println!("  (No cruises to score)");
    }
    for c in &s.top_cruises {
        println!("  {:>3} {:<9} {} {} {}", c.total_score, format!("{:?}", c.recommendation), c.departure_date, c.ship, c.itinerary);
        for insight in &c.insights {
            println!("        {insight}");
        }
    }
    println!();
}

fn print_forecast(store: &RecordStore) {
    let report = predictive::predictive_report(store);
    let b = &report.historical_baseline;
    println!("=== FORECAST ===");
    println!(
        "  history: {} cruises | avg coin-in ${:.0} | avg points {:.0} | avg ROI {:.1}%",
        b.cruises_analyzed, b.avg_coin_in_per_cruise, b.avg_points_per_cruise, b.avg_historical_roi
    );
    match &report.tier_forecast {
        Some(TierForecast::Progress { projection, .. }) => println!("  {projection}"),
        Some(TierForecast::MaxTierReached { current_tier, .. }) => {
            println!("  Top tier reached ({current_tier})");
        }
        None => println!("  (Not enough casino history to forecast the next tier)"),
    }
    for p in &report.roi_projections {
        println!(
            "  +{:<2} cruises | {:>8.0} points | ROI {:>6.1}% | {}",
            p.cruises_from_now, p.projected_points, p.projected_roi, p.projected_tier
        );
    }
    let band = &report.risk_band;
    println!(
        "  ROI band: worst10 {:.1}% | median {:.1}% | best10 {:.1}% ({} runs)",
        band.roi.worst10, band.roi.median, band.roi.best10, band.simulation_count
    );
    println!();
}

fn print_scenario(store: &RecordStore, request: &ScenarioRequest) -> Result<()> {
    let result = predictive::simulate_scenario(store, request)?;
    println!("=== SCENARIO ({} cruises) ===", result.future_cruises);
    println!("  coin-in per cruise: ${:.0} ({} points)", result.avg_coin_in, result.points_per_cruise);
    println!(
        "  projected:          {:.0} points, {} ROI {:.1}%",
        result.projection.projected_points, result.projection.projected_tier, result.projection.projected_roi
    );
    if let Some(t) = &result.target {
        println!(
            "  target {}: {} points needed over {} cruises (${:.0}), {}",
            t.tier,
            t.points_needed,
            t.cruises_needed,
            t.spend_needed,
            if t.achievable { "achievable" } else { "out of reach" }
        );
    }
    println!();
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
