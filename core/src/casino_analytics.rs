//! Casino ROI / comp calculation.
//!
//! RULE: Analytics never mutates cruises, offers or bookings. The only
//! write is the per-cruise `CasinoAnalytics` cache entry, upserted through
//! the store.
//!
//! Economics: coin-in is points × $5. Retail value is cabin price plus
//! taxes; the pay-table tier for the point total gives an offer value, and
//! savings are what the offer does not cover. ROI compares savings plus perk
//! value against coin-in.

use crate::error::{StoreError, StoreResult};
use crate::model::{CasinoAnalytics, CasinoOffer, Cruise};
use crate::paytable::{self, COIN_IN_PER_POINT};
use crate::reconcile;
use crate::store::RecordStore;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Taxes and fees assumed on an estimated fare.
const TAX_RATE: f64 = 0.15;

static FREE_PLAY_PERK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$(\d+)\s*free\s*play").expect("valid regex"));

/// Inputs of one ROI/comp calculation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompInput {
    pub cruise_id:   String,
    pub cabin_price: f64,
    pub taxes:       f64,
    pub offer_type:  String,
    pub perks:       Vec<String>,
    pub points:      u64,
}

/// Fixed dollar credit for each recognized perk keyword, plus any
/// "$N free play" amount.
pub fn perks_value(perks: &[String]) -> f64 {
    perks.iter().map(|perk| perk_value(perk)).sum()
}

fn perk_value(perk: &str) -> f64 {
    let p = perk.to_lowercase();
    let has = |needle: &str| p.contains(needle);
    let mut value = 0.0;

    if has("specialty dining") || has("chef's table") {
        value += 150.0;
    } else if has("dining package") {
        value += 300.0;
    }
    if has("beverage package") || has("drink package") {
        value += 200.0;
    } else if has("wine tasting") {
        value += 75.0;
    }
    if has("spa credit") || has("spa treatment") {
        value += 100.0;
    }
    if has("shore excursion") || has("excursion credit") {
        value += 200.0;
    }
    if has("internet") || has("wifi") {
        value += 100.0;
    }
    if has("gratuities") || has("tips") {
        value += 150.0;
    }
    if let Some(caps) = FREE_PLAY_PERK.captures(perk) {
        value += caps[1].parse::<f64>().unwrap_or(0.0);
    }
    value
}

/// Pure calculation. Identity and stamps are left for the store.
pub fn compute(input: &CompInput) -> CasinoAnalytics {
    let tier = paytable::tier_or_lowest(input.points);
    let offer_value = paytable::tier_for_points(input.points)
        .map(|t| t.offer_value())
        .unwrap_or(0.0);

    let retail_value = input.cabin_price + input.taxes;
    let savings = (retail_value - offer_value).max(0.0);
    let out_of_pocket = (retail_value - savings).max(0.0);
    let total_value = savings + perks_value(&input.perks);

    let points = input.points as f64;
    let coin_in = points * COIN_IN_PER_POINT;
    let (cost_per_point, value_per_point, roi) = if coin_in > 0.0 {
        (out_of_pocket / points, total_value / points, (total_value - coin_in) / coin_in * 100.0)
    } else {
        (0.0, 0.0, 0.0)
    };

    CasinoAnalytics {
        cruise_id:         input.cruise_id.clone(),
        cabin_price:       input.cabin_price,
        taxes:             input.taxes,
        offer_type:        input.offer_type.clone(),
        perks:             input.perks.clone(),
        points:            input.points,
        retail_value,
        savings,
        out_of_pocket,
        total_value,
        coin_in,
        cost_per_point,
        value_per_point,
        roi,
        reward_tier:       tier.reward.to_string(),
        next_cruise_bonus: tier.next_cruise_bonus.to_string(),
        ..CasinoAnalytics::default()
    }
}

/// Calculate and cache the analytics for one cruise.
pub fn calculate_casino_analytics(store: &mut RecordStore, input: CompInput) -> CasinoAnalytics {
    let analytics = compute(&input);
    log::info!(
        "casino: cruise {} savings={:.0} roi={:.1}% value/pt={:.2}",
        input.cruise_id, analytics.savings, analytics.roi, analytics.value_per_point
    );
    store.upsert_casino_analytics(analytics)
}

// ── Offer analysis ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonData {
    pub market_price:       f64,
    pub offer_value:        f64,
    pub total_savings:      f64,
    pub effective_discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferAnalysis {
    pub offer_id:        String,
    pub cruise_id:       String,
    pub analytics:       CasinoAnalytics,
    pub recommendations: Vec<String>,
    pub comparison:      ComparisonData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CruiseCasinoSummary {
    pub cruise_id:               String,
    pub ship:                    String,
    pub itinerary:               String,
    pub departure_date:          String,
    pub available_offers:        Vec<OfferAnalysis>,
    pub best_offer:              Option<OfferAnalysis>,
    pub total_potential_savings: f64,
    pub recommended_action:      String,
}

fn recommendations(
    analytics: &CasinoAnalytics,
    cruise:    &Cruise,
    offer:     &CasinoOffer,
    today:     chrono::NaiveDate,
) -> Vec<String> {
    let mut recs = Vec::new();

    recs.push(
        if analytics.roi > 50.0 {
            "Excellent ROI - highly recommended"
        } else if analytics.roi > 25.0 {
            "Good ROI - worth considering"
        } else if analytics.roi > 0.0 {
            "Modest ROI - consider other options"
        } else {
            "Negative ROI - not recommended"
        }
        .to_string(),
    );

    recs.push(
        if analytics.value_per_point > 2.0 {
            "Excellent value per point (>$2)"
        } else if analytics.value_per_point > 1.0 {
            "Good value per point (>$1)"
        } else {
            "Low value per point (<$1)"
        }
        .to_string(),
    );

    if analytics.savings > 1000.0 {
        recs.push("Significant savings (>$1,000)".to_string());
    } else if analytics.savings > 500.0 {
        recs.push("Good savings (>$500)".to_string());
    }

    if let Some(exp) = reconcile::parse_date(&offer.expires) {
        let days = (exp - today).num_days();
        if days <= 7 {
            recs.push("Offer expires soon - act quickly".to_string());
        } else if days <= 30 {
            recs.push("Offer expires within 30 days".to_string());
        }
    }

    if let Some(dep) = reconcile::parse_date(&cruise.departure_date) {
        if (dep - today).num_days() <= 60 {
            recs.push("Cruise departing soon - book now for best availability".to_string());
        }
    }
    recs
}

/// Evaluate every unexpired offer against one cruise at the user's current
/// point balance, best ROI first. The best evaluation is cached.
pub fn generate_offer_analysis(store: &mut RecordStore, cruise_id: &str) -> StoreResult<Vec<OfferAnalysis>> {
    let cruise = store
        .get_cruise(cruise_id)
        .ok_or_else(|| StoreError::NotFound { entity: "cruise", id: cruise_id.to_string() })?;
    let today = store.today();
    let points = store.user_profile().points;

    let nights = if cruise.nights > 0 { cruise.nights } else { reconcile::DEFAULT_NIGHTS };
    let base_price = reconcile::estimate_fare(&cruise.ship, nights, "Interior");
    let taxes = (base_price * TAX_RATE).round();
    let market_price = base_price + taxes;
    let offer_value = paytable::tier_for_points(points)
        .map(|t| t.offer_value())
        .unwrap_or(0.0);

    let mut analyses: Vec<OfferAnalysis> = store
        .get_casino_offers()
        .iter()
        .filter(|offer| {
            reconcile::parse_date(&offer.expires).map_or(true, |exp| exp >= today)
        })
        .map(|offer| {
            let analytics = compute(&CompInput {
                cruise_id:   cruise.id.clone(),
                cabin_price: base_price,
                taxes,
                offer_type:  offer.offer_type.clone(),
                perks:       vec![offer.offer_name.clone()],
                points,
            });
            let total_savings = market_price - offer_value;
            OfferAnalysis {
                offer_id:        offer.id.clone(),
                cruise_id:       cruise.id.clone(),
                recommendations: recommendations(&analytics, &cruise, offer, today),
                comparison:      ComparisonData {
                    market_price,
                    offer_value,
                    total_savings,
                    effective_discount: if market_price > 0.0 {
                        total_savings / market_price * 100.0
                    } else {
                        0.0
                    },
                },
                analytics,
            }
        })
        .collect();

    analyses.sort_by(|a, b| b.analytics.roi.total_cmp(&a.analytics.roi));

    if let Some(best) = analyses.first_mut() {
        best.analytics = store.upsert_casino_analytics(best.analytics.clone());
    }
    log::debug!("casino: {} offers analysed for cruise {cruise_id}", analyses.len());
    Ok(analyses)
}

/// Offer analysis for one cruise rolled up into a recommended action.
pub fn cruise_casino_summary(store: &mut RecordStore, cruise_id: &str) -> StoreResult<CruiseCasinoSummary> {
    let available = generate_offer_analysis(store, cruise_id)?;
    let cruise = store
        .get_cruise(cruise_id)
        .ok_or_else(|| StoreError::NotFound { entity: "cruise", id: cruise_id.to_string() })?;

    let best = available.first().cloned();
    let total_potential_savings = available.iter().map(|a| a.analytics.savings).sum();
    let recommended_action = match &best {
        None => "No casino offers available".to_string(),
        Some(b) if b.analytics.roi > 25.0 => {
            format!("Book with {} offer - {:.1}% ROI", b.analytics.reward_tier, b.analytics.roi)
        }
        Some(b) if b.analytics.roi > 0.0 => {
            format!("Consider {} offer - {:.1}% ROI", b.analytics.reward_tier, b.analytics.roi)
        }
        Some(_) => "Casino offers not favorable - consider regular booking".to_string(),
    };

    Ok(CruiseCasinoSummary {
        cruise_id:        cruise.id,
        ship:             cruise.ship,
        itinerary:        cruise.itinerary_name,
        departure_date:   cruise.departure_date,
        available_offers: available,
        best_offer:       best,
        total_potential_savings,
        recommended_action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perk_keywords_add_up() {
        let perks = vec![
            "Specialty Dining for two".to_string(),
            "Deluxe Beverage Package".to_string(),
            "$250 Free Play".to_string(),
        ];
        assert_eq!(perks_value(&perks), 150.0 + 200.0 + 250.0);
        assert_eq!(perks_value(&["Dining package".to_string()]), 300.0);
    }

    #[test]
    fn zero_points_yield_zero_ratios() {
        let a = compute(&CompInput { cabin_price: 1000.0, taxes: 150.0, ..CompInput::default() });
        assert_eq!(a.coin_in, 0.0);
        assert_eq!(a.roi, 0.0);
        assert_eq!(a.cost_per_point, 0.0);
        assert_eq!(a.reward_tier, paytable::PAY_TABLE[0].reward);
    }
}
