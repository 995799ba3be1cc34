//! Forward projections over the casino history.
//!
//! History is every cruise with casino-department spend on file. Points
//! earned on a cruise are spend / $5, floored. ROI per cruise comes from
//! the analytics cache when one exists.
//!
//! RULE: The risk band draws from a ForecastRng seeded from config, never
//! from a platform RNG. Same store and seed, same band.

use crate::error::{StoreError, StoreResult};
use crate::paytable::{self, COIN_IN_PER_POINT};
use crate::reconcile;
use crate::rng::ForecastRng;
use crate::store::RecordStore;
use crate::types::Timestamp;
use serde::Serialize;

pub const SIMULATION_COUNT: usize = 1000;
/// Horizons, in cruises, for the standard ROI projection table.
pub const PROJECTION_HORIZONS: [u32; 4] = [1, 3, 5, 10];
/// Coin-in assumed for a scenario when there is no history.
pub const DEFAULT_SCENARIO_COIN_IN: f64 = 5000.0;
pub const MAX_SCENARIO_CRUISES: u32 = 50;
/// ROI growth per projected cruise as play compounds tier benefits.
const ROI_GROWTH_PER_CRUISE: f64 = 0.02;
const BASE_TIER_LABEL: &str = "PRIME";
const SEA_DAY_SHARE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalCruise {
    pub cruise_id:    String,
    pub ship:         String,
    pub nights:       i64,
    pub casino_spend: f64,
    pub points:       u64,
    pub roi:          f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalBaseline {
    pub avg_coin_in_per_cruise: f64,
    pub avg_points_per_cruise:  f64,
    pub avg_historical_roi:     f64,
    pub avg_nights:             f64,
    pub cruises_analyzed:       usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TierForecast {
    Progress {
        current_tier:           String,
        current_points:         u64,
        next_tier:              String,
        next_tier_points:       u64,
        points_needed:          u64,
        cruises_needed:         u64,
        days_needed:            u64,
        avg_points_per_cruise:  f64,
        estimated_spend_needed: f64,
        projection:             String,
    },
    MaxTierReached {
        current_tier:   String,
        current_points: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiProjection {
    pub cruises_from_now:       u32,
    pub projected_points:       f64,
    pub projected_tier:         String,
    pub projected_roi:          f64,
    pub projected_total_value:  f64,
    pub projected_total_spend:  f64,
}

/// 10th / 50th / 90th percentile of one simulated quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileBand {
    pub worst10: f64,
    pub median:  f64,
    pub best10:  f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBand {
    pub roi:              PercentileBand,
    pub free_play:        PercentileBand,
    pub out_of_pocket:    PercentileBand,
    pub expected_roi:     f64,
    pub roi_spread:       f64,
    pub simulation_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictiveReport {
    pub tier_forecast:       Option<TierForecast>,
    pub roi_projections:     Vec<RoiProjection>,
    pub risk_band:           RiskBand,
    pub historical_baseline: HistoricalBaseline,
    pub generated_at:        Timestamp,
}

// ── History ────────────────────────────────────────────────────────

fn points_for_spend(spend: f64) -> u64 {
    (spend / COIN_IN_PER_POINT).floor().max(0.0) as u64
}

fn nights_or_default(nights: i64) -> i64 {
    if nights > 0 { nights } else { reconcile::DEFAULT_NIGHTS }
}

/// Cruises with casino spend on file, in departure order.
pub fn historical_cruises(store: &RecordStore) -> Vec<HistoricalCruise> {
    let spend = store.casino_spend_by_cruise();
    let analytics = store.all_casino_analytics();
    let mut cruises: Vec<_> = store.state().cruises.iter().collect();
    cruises.sort_by(|a, b| crate::store::by_departure(&a.departure_date, &b.departure_date));

    cruises
        .into_iter()
        .filter_map(|c| {
            let casino_spend = spend.get(&c.id).copied().filter(|s| *s > 0.0)?;
            Some(HistoricalCruise {
                cruise_id: c.id.clone(),
                ship:      c.ship.clone(),
                nights:    nights_or_default(c.nights),
                casino_spend,
                points:    points_for_spend(casino_spend),
                roi:       analytics
                    .iter()
                    .find(|a| a.cruise_id == c.id)
                    .map_or(0.0, |a| a.roi),
            })
        })
        .collect()
}

pub fn baseline(history: &[HistoricalCruise]) -> HistoricalBaseline {
    if history.is_empty() {
        return HistoricalBaseline::default();
    }
    let n = history.len() as f64;
    HistoricalBaseline {
        avg_coin_in_per_cruise: history.iter().map(|h| h.casino_spend).sum::<f64>() / n,
        avg_points_per_cruise:  history.iter().map(|h| h.points as f64).sum::<f64>() / n,
        avg_historical_roi:     history.iter().map(|h| h.roi).sum::<f64>() / n,
        avg_nights:             history.iter().map(|h| h.nights as f64).sum::<f64>() / n,
        cruises_analyzed:       history.len(),
    }
}

// ── Projections ────────────────────────────────────────────────────

fn tier_label(points: f64) -> String {
    paytable::tier_for_points(points.max(0.0) as u64)
        .map_or_else(|| BASE_TIER_LABEL.to_string(), |t| t.reward.to_string())
}

fn project(current_points: u64, b: &HistoricalBaseline, cruises: u32) -> RoiProjection {
    let count = cruises as f64;
    let projected_points = current_points as f64 + b.avg_points_per_cruise * count;
    let projected_roi = b.avg_historical_roi * (1.0 + ROI_GROWTH_PER_CRUISE * count);
    let spend = count * b.avg_coin_in_per_cruise;
    RoiProjection {
        cruises_from_now:      cruises,
        projected_points,
        projected_tier:        tier_label(projected_points),
        projected_roi,
        projected_total_value: spend * (1.0 + projected_roi / 100.0),
        projected_total_spend: spend,
    }
}

fn tier_forecast(current_tier: &str, current_points: u64, b: &HistoricalBaseline) -> Option<TierForecast> {
    let Some(next) = paytable::next_tier(current_points) else {
        return Some(TierForecast::MaxTierReached {
            current_tier: current_tier.to_string(),
            current_points,
        });
    };
    if b.avg_points_per_cruise <= 0.0 {
        return None;
    }
    let points_needed = next.points - current_points;
    let cruises_needed = (points_needed as f64 / b.avg_points_per_cruise).ceil() as u64;
    let avg_nights = if b.avg_nights > 0.0 { b.avg_nights } else { reconcile::DEFAULT_NIGHTS as f64 };
    let days_needed = (cruises_needed as f64 * avg_nights).ceil() as u64;
    let plural = if cruises_needed == 1 { "" } else { "s" };

    Some(TierForecast::Progress {
        current_tier:           current_tier.to_string(),
        current_points,
        next_tier:              next.reward.to_string(),
        next_tier_points:       next.points,
        points_needed,
        cruises_needed,
        days_needed,
        avg_points_per_cruise:  b.avg_points_per_cruise,
        estimated_spend_needed: points_needed as f64 * COIN_IN_PER_POINT,
        projection:             format!(
            "At your average coin-in of ${:.0}, you'll reach {} in {} cruise{} or {} days.",
            b.avg_coin_in_per_cruise, next.reward, cruises_needed, plural, days_needed
        ),
    })
}

fn percentiles(mut values: Vec<f64>) -> PercentileBand {
    if values.is_empty() {
        return PercentileBand::default();
    }
    values.sort_by(f64::total_cmp);
    let at = |q: f64| values[((values.len() as f64 * q).floor() as usize).min(values.len() - 1)];
    PercentileBand { worst10: at(0.1), median: at(0.5), best10: at(0.9) }
}

/// Seeded stochastic simulation around the historical mean.
pub fn risk_band(history: &[HistoricalCruise], b: &HistoricalBaseline, seed: u64) -> RiskBand {
    let n = history.len().max(1) as f64;
    let variance = history
        .iter()
        .map(|h| (h.roi - b.avg_historical_roi).powi(2))
        .sum::<f64>()
        / n;
    let spread = variance.sqrt();

    let mut rng = ForecastRng::seeded(seed);
    let mut roi = Vec::with_capacity(SIMULATION_COUNT);
    let mut free_play = Vec::with_capacity(SIMULATION_COUNT);
    let mut out_of_pocket = Vec::with_capacity(SIMULATION_COUNT);
    for _ in 0..SIMULATION_COUNT {
        roi.push(rng.perturb(b.avg_historical_roi, spread));
        free_play.push(b.avg_coin_in_per_cruise * 0.1 * rng.uniform(0.8, 1.2));
        out_of_pocket.push(b.avg_coin_in_per_cruise * rng.uniform(0.85, 1.15));
    }
    log::debug!("predictive: {SIMULATION_COUNT} risk-band samples drawn (seed {seed})");

    RiskBand {
        roi:              percentiles(roi),
        free_play:        percentiles(free_play),
        out_of_pocket:    percentiles(out_of_pocket),
        expected_roi:     b.avg_historical_roi,
        roi_spread:       spread,
        simulation_count: SIMULATION_COUNT,
    }
}

/// Tier forecast, standard ROI projections and the risk band.
pub fn predictive_report(store: &RecordStore) -> PredictiveReport {
    let history = historical_cruises(store);
    let b = baseline(&history);
    let profile = store.user_profile();

    let report = PredictiveReport {
        tier_forecast:       tier_forecast(&profile.level, profile.points, &b),
        roi_projections:     PROJECTION_HORIZONS.iter().map(|&h| project(profile.points, &b, h)).collect(),
        risk_band:           risk_band(&history, &b, store.config().analytics.forecast_seed),
        historical_baseline: b,
        generated_at:        store.now(),
    };
    log::info!(
        "predictive: {} historical cruises, avg coin-in {:.0}, avg roi {:.1}%",
        b.cruises_analyzed, b.avg_coin_in_per_cruise, b.avg_historical_roi
    );
    report
}

// ── Scenarios ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRequest {
    pub future_cruises: u32,
    pub avg_coin_in:    Option<f64>,
    pub target_tier:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetProgress {
    pub tier:           String,
    pub tier_points:    u64,
    pub points_needed:  u64,
    pub cruises_needed: u64,
    pub spend_needed:   f64,
    pub achievable:     bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub future_cruises:    u32,
    pub avg_coin_in:       f64,
    pub points_per_cruise: u64,
    pub projection:        RoiProjection,
    pub target:            Option<TargetProgress>,
}

/// What-if projection for a number of future cruises at a given coin-in.
pub fn simulate_scenario(store: &RecordStore, request: &ScenarioRequest) -> StoreResult<ScenarioResult> {
    if !(1..=MAX_SCENARIO_CRUISES).contains(&request.future_cruises) {
        return Err(StoreError::InvalidInput(format!(
            "futureCruises must be between 1 and {MAX_SCENARIO_CRUISES}, got {}",
            request.future_cruises
        )));
    }
    if request.avg_coin_in.is_some_and(|c| !c.is_finite() || c < 0.0) {
        return Err(StoreError::InvalidInput("avgCoinIn must be a non-negative amount".to_string()));
    }

    let history = historical_cruises(store);
    let mut b = baseline(&history);
    let avg_coin_in = request.avg_coin_in.unwrap_or(if b.cruises_analyzed > 0 {
        b.avg_coin_in_per_cruise
    } else {
        DEFAULT_SCENARIO_COIN_IN
    });
    let points_per_cruise = points_for_spend(avg_coin_in);
    b.avg_coin_in_per_cruise = avg_coin_in;
    b.avg_points_per_cruise = points_per_cruise as f64;

    let current_points = store.user_profile().points;
    let projection = project(current_points, &b, request.future_cruises);

    let target = match request.target_tier.as_deref().filter(|t| !t.trim().is_empty()) {
        None => None,
        Some(name) => {
            let tier = paytable::find_tier(name).ok_or_else(|| {
                StoreError::InvalidInput(format!("unknown target tier: {name}"))
            })?;
            let points_needed = tier.points.saturating_sub(current_points);
            let cruises_needed = if points_per_cruise == 0 {
                0
            } else {
                points_needed.div_ceil(points_per_cruise)
            };
            Some(TargetProgress {
                tier:          tier.reward.to_string(),
                tier_points:   tier.points,
                points_needed,
                cruises_needed,
                spend_needed:  points_needed as f64 * COIN_IN_PER_POINT,
                achievable:    points_needed == 0
                    || (points_per_cruise > 0 && cruises_needed <= request.future_cruises as u64),
            })
        }
    };

    Ok(ScenarioResult {
        future_cruises: request.future_cruises,
        avg_coin_in,
        points_per_cruise,
        projection,
        target,
    })
}

// ── Player context ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerContext {
    pub total_coin_in:          f64,
    pub total_points:           u64,
    pub current_points:         u64,
    pub tier_level:             String,
    pub cruises_completed:      usize,
    pub booked_cruises:         usize,
    pub avg_coin_in_per_cruise: f64,
    pub avg_roi:                f64,
    pub points_per_day:         f64,
    pub points_per_sea_day:     f64,
    pub points_per_port_day:    f64,
}

/// Casino play totals and rates across cruises with financial records.
pub fn player_context(store: &RecordStore) -> PlayerContext {
    let history = historical_cruises(store);
    let b = baseline(&history);
    let profile = store.user_profile();
    let today = store.today();

    let total_coin_in: f64 = history.iter().map(|h| h.casino_spend).sum();
    let total_points: u64 = history.iter().map(|h| h.points).sum();
    let total_nights: i64 = history.iter().map(|h| h.nights).sum();
    let sea_days: i64 = history
        .iter()
        .map(|h| (h.nights as f64 * SEA_DAY_SHARE).floor() as i64)
        .sum();
    let port_days: i64 = history
        .iter()
        .map(|h| (h.nights as f64 * (1.0 - SEA_DAY_SHARE)).ceil() as i64)
        .sum();
    let rate = |days: i64| if days > 0 { total_points as f64 / days as f64 } else { 0.0 };

    let booked_cruises = store
        .get_booked_cruises()
        .iter()
        .filter(|c| reconcile::parse_date(&c.departure_date).is_some_and(|d| d > today))
        .count();

    PlayerContext {
        total_coin_in,
        total_points,
        current_points:         profile.points,
        tier_level:             profile.level.clone(),
        cruises_completed:      history.len(),
        booked_cruises,
        avg_coin_in_per_cruise: b.avg_coin_in_per_cruise,
        avg_roi:                b.avg_historical_roi,
        points_per_day:         rate(total_nights),
        points_per_sea_day:     rate(sea_days),
        points_per_port_day:    rate(port_days),
    }
}
