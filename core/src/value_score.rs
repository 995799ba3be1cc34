//! Multi-factor cruise value score (0–100).
//!
//! RULE: Every factor is clamped to [0, 100] before weighting and the
//! weights sum to 1.0, so the total can never leave [0, 100].
//! RULE: A booked cruise overlapping the candidate's dates forces the
//! schedule factor to 0 regardless of booking window.

use crate::model::Cruise;
use crate::reconcile;
use crate::store::RecordStore;
use crate::types::Timestamp;
use chrono::NaiveDate;
use serde::Serialize;

/// Factor weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub roi:                f64,
    pub offer_value:        f64,
    pub ship_profitability: f64,
    pub schedule:           f64,
    pub port_distance:      f64,
    pub cabin_match:        f64,
    pub pricing:            f64,
}

pub const WEIGHTS: ScoreWeights = ScoreWeights {
    roi:                0.25,
    offer_value:        0.20,
    ship_profitability: 0.15,
    schedule:           0.15,
    port_distance:      0.10,
    cabin_match:        0.10,
    pricing:            0.05,
};

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.roi
            + self.offer_value
            + self.ship_profitability
            + self.schedule
            + self.port_distance
            + self.cabin_match
            + self.pricing
    }
}

/// Drive-distance penalty per departure port, first substring match wins.
const PORT_DISTANCES: &[(&str, f64)] = &[
    ("Los Angeles", 0.0),
    ("Long Beach", 0.0),
    ("San Pedro", 0.0),
    ("San Diego", 10.0),
    ("Galveston", 50.0),
    ("Fort Lauderdale", 70.0),
    ("Miami", 70.0),
    ("Port Canaveral", 70.0),
    ("Seattle", 80.0),
    ("Vancouver", 85.0),
    ("New York", 90.0),
    ("Boston", 95.0),
    ("Baltimore", 75.0),
];

/// Market reference fare for the pricing factor.
const REFERENCE_FARE: f64 = 1500.0;
const NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueScoreFactors {
    pub roi_score:                f64,
    pub offer_value_score:        f64,
    pub ship_profitability_score: f64,
    pub schedule_score:           f64,
    pub port_distance_score:      f64,
    pub cabin_match_score:        f64,
    pub pricing_score:            f64,
}

impl ValueScoreFactors {
    pub fn weighted_total(&self, w: &ScoreWeights) -> f64 {
        self.roi_score * w.roi
            + self.offer_value_score * w.offer_value
            + self.ship_profitability_score * w.ship_profitability
            + self.schedule_score * w.schedule
            + self.port_distance_score * w.port_distance
            + self.cabin_match_score * w.cabin_match
            + self.pricing_score * w.pricing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Recommendation {
    pub fn for_score(score: u32) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::Poor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CruiseValueScore {
    pub cruise_id:      String,
    pub ship:           String,
    pub itinerary:      String,
    pub departure_date: String,
    pub total_score:    u32,
    pub factors:        ValueScoreFactors,
    pub recommendation: Recommendation,
    pub insights:       Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueScoreSummary {
    pub total_cruises_scored: usize,
    pub excellent_count:      usize,
    pub good_count:           usize,
    pub fair_count:           usize,
    pub poor_count:           usize,
    pub average_score:        u32,
    pub top_cruises:          Vec<CruiseValueScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueScoreReport {
    pub scores:       Vec<CruiseValueScore>,
    pub summary:      ValueScoreSummary,
    pub weights:      ScoreWeights,
    pub generated_at: Timestamp,
}

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

// ── Factors ────────────────────────────────────────────────────────

fn roi_score(store: &RecordStore, cruise_id: &str) -> f64 {
    if let Some(a) = store.casino_analytics_for(cruise_id).first() {
        return clamp(a.roi);
    }
    let all = store.all_casino_analytics();
    if all.is_empty() {
        return NEUTRAL;
    }
    clamp(all.iter().map(|a| a.roi).sum::<f64>() / all.len() as f64)
}

fn offer_value_score(store: &RecordStore, cruise: &Cruise) -> f64 {
    let cruise_code = cruise.offer_code.as_deref().unwrap_or_default().trim();
    let departure = reconcile::day_key(&cruise.departure_date);

    let applicable: Vec<f64> = store
        .state()
        .casino_offers
        .iter()
        .filter(|offer| {
            let code = offer.offer_code.trim();
            if !code.is_empty() && !cruise_code.is_empty() {
                return code == cruise_code;
            }
            !departure.is_empty()
                && offer.sailing_dates.iter().any(|d| reconcile::day_key(d) == departure)
        })
        .map(|offer| offer.trade_in_amount())
        .collect();

    if applicable.is_empty() {
        return 30.0;
    }
    clamp(applicable.iter().sum::<f64>() / 50.0)
}

fn ship_profitability_score(store: &RecordStore, ship: &str) -> f64 {
    let needle = ship.to_lowercase();
    let analytics = store.all_casino_analytics();
    let rois: Vec<f64> = store
        .state()
        .cruises
        .iter()
        .filter(|c| c.ship.to_lowercase().contains(&needle))
        .filter_map(|c| analytics.iter().find(|a| a.cruise_id == c.id))
        .map(|a| a.roi)
        .collect();
    if rois.is_empty() {
        return NEUTRAL;
    }
    clamp(rois.iter().sum::<f64>() / rois.len() as f64)
}

fn sailing_window(c: &Cruise) -> Option<(NaiveDate, NaiveDate)> {
    let start = reconcile::parse_date(&c.departure_date)?;
    let end = reconcile::parse_date(&c.return_date)
        .or_else(|| start.checked_add_days(chrono::Days::new(c.nights.max(0) as u64)))
        .unwrap_or(start);
    Some((start, end.max(start)))
}

fn schedule_score(store: &RecordStore, cruise: &Cruise, today: NaiveDate) -> f64 {
    let Some((start, end)) = sailing_window(cruise) else {
        return NEUTRAL;
    };
    let conflict = store
        .get_booked_cruises()
        .iter()
        .filter(|b| b.id != cruise.id)
        .filter_map(sailing_window)
        .any(|(b_start, b_end)| start <= b_end && b_start <= end);
    if conflict {
        return 0.0;
    }

    let days_until = (start - today).num_days();
    if days_until < 0 {
        0.0
    } else if days_until < 30 {
        30.0
    } else if days_until > 365 {
        40.0
    } else if (60..=180).contains(&days_until) {
        100.0
    } else {
        70.0
    }
}

fn port_distance_score(port: &str) -> f64 {
    let port = port.to_lowercase();
    PORT_DISTANCES
        .iter()
        .find(|(name, _)| port.contains(&name.to_lowercase()))
        .map_or(NEUTRAL, |(_, distance)| clamp(100.0 - distance))
}

fn cabin_match_score(cabin: Option<&str>) -> f64 {
    let Some(cabin) = cabin.map(str::to_lowercase) else {
        return NEUTRAL;
    };
    if cabin.contains("suite") {
        100.0
    } else if cabin.contains("balcony") {
        80.0
    } else if cabin.contains("oceanview") || cabin.contains("ocean view") {
        60.0
    } else if cabin.contains("interior") {
        40.0
    } else {
        NEUTRAL
    }
}

fn pricing_score(cruise: &Cruise) -> f64 {
    let lowest = cruise
        .pricing_current
        .as_ref()
        .and_then(|p| p.lowest())
        .or_else(|| cruise.pricing_lowest.as_ref().and_then(|p| p.lowest()));
    match lowest {
        Some(fare) => clamp(REFERENCE_FARE / fare * 50.0),
        None => NEUTRAL,
    }
}

fn insights(factors: &ValueScoreFactors, total: u32, ship: &str, home_base: &str) -> Vec<String> {
    let mut out = Vec::new();
    if factors.roi_score >= 75.0 {
        out.push("Excellent ROI potential based on historical data".to_string());
    } else if factors.roi_score < 25.0 {
        out.push("Lower ROI potential - consider other options".to_string());
    }
    if factors.offer_value_score >= 70.0 {
        out.push("Strong casino offer value available".to_string());
    }
    if factors.ship_profitability_score >= 80.0 {
        out.push(format!("{ship} has proven to be highly profitable"));
    }
    if factors.schedule_score == 0.0 {
        out.push("Schedule conflict detected with booked cruise".to_string());
    } else if factors.schedule_score >= 90.0 {
        out.push("Perfect timing - optimal booking window".to_string());
    }
    if factors.port_distance_score >= 90.0 {
        out.push(format!("No airfare needed - driving distance from {home_base}"));
    } else if factors.port_distance_score < 30.0 {
        out.push(format!("Consider airfare costs from {home_base}"));
    }
    if factors.cabin_match_score >= 90.0 {
        out.push("Cabin type matches your preferences perfectly".to_string());
    }
    if total >= 80 {
        out.push("Top-tier opportunity - highly recommended".to_string());
    } else if total < 40 {
        out.push("Multiple concerns - proceed with caution".to_string());
    }
    out
}

// ── Scoring ────────────────────────────────────────────────────────

pub fn score_cruise(store: &RecordStore, cruise: &Cruise) -> CruiseValueScore {
    let today = store.today();
    let factors = ValueScoreFactors {
        roi_score:                roi_score(store, &cruise.id),
        offer_value_score:        offer_value_score(store, cruise),
        ship_profitability_score: ship_profitability_score(store, &cruise.ship),
        schedule_score:           schedule_score(store, cruise, today),
        port_distance_score:      port_distance_score(&cruise.departure_port),
        cabin_match_score:        cabin_match_score(cruise.cabin_type.as_deref()),
        pricing_score:            pricing_score(cruise),
    };
    let total_score = factors.weighted_total(&WEIGHTS).round().clamp(0.0, 100.0) as u32;
    let home_base = &store.config().analytics.home_base;

    CruiseValueScore {
        cruise_id:      cruise.id.clone(),
        ship:           cruise.ship.clone(),
        itinerary:      cruise.itinerary_name.clone(),
        departure_date: cruise.departure_date.clone(),
        total_score,
        factors,
        recommendation: Recommendation::for_score(total_score),
        insights:       insights(&factors, total_score, &cruise.ship, home_base),
    }
}

/// Score the given cruises (all when `cruise_ids` is `None`), best first.
pub fn cruise_value_scores(store: &RecordStore, cruise_ids: Option<&[String]>) -> ValueScoreReport {
    let mut scores: Vec<CruiseValueScore> = store
        .state()
        .cruises
        .iter()
        .filter(|c| cruise_ids.map_or(true, |ids| ids.iter().any(|id| *id == c.id)))
        .map(|c| score_cruise(store, c))
        .collect();
    scores.sort_by(|a, b| b.total_score.cmp(&a.total_score));

    let count = |level: Recommendation| scores.iter().filter(|s| s.recommendation == level).count();
    let average_score = if scores.is_empty() {
        0
    } else {
        (scores.iter().map(|s| s.total_score as f64).sum::<f64>() / scores.len() as f64).round() as u32
    };
    let summary = ValueScoreSummary {
        total_cruises_scored: scores.len(),
        excellent_count:      count(Recommendation::Excellent),
        good_count:           count(Recommendation::Good),
        fair_count:           count(Recommendation::Fair),
        poor_count:           count(Recommendation::Poor),
        average_score,
        top_cruises:          scores.iter().take(5).cloned().collect(),
    };
    log::info!(
        "value-score: scored {} cruises, average {}",
        summary.total_cruises_scored, summary.average_score
    );

    ValueScoreReport { scores, summary, weights: WEIGHTS, generated_at: store.now() }
}
