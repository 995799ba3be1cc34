//! Entity model — the plain records the store owns.
//!
//! Imported data is messy: most fields are optional and dates stay textual
//! until reconciliation standardizes them. Every entity carries an identity
//! and `createdAt` / `updatedAt` stamps assigned by the store.
//!
//! Field names serialize in camelCase; that is the shape of the persisted
//! document and of the rows the import collaborator hands over.

use crate::types::{DateText, EntityId, Timestamp};
use serde::{Deserialize, Serialize};

// ── Cruise ─────────────────────────────────────────────────────────

/// Derived from today's date against the departure/return window.
/// Never authoritative: the store recomputes it on every cruise mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStatus {
    Upcoming,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    OnSale,
    SoldOut,
    Canceled,
}

/// A fare observation for each cabin class, tagged with where and when it
/// was fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interior:   Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oceanview:  Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balcony:    Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite:      Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source:     Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
}

impl PricingSnapshot {
    /// Lowest positive fare across cabin classes.
    pub fn lowest(&self) -> Option<f64> {
        [self.interior, self.oceanview, self.balcony, self.suite]
            .into_iter()
            .flatten()
            .filter(|p| *p > 0.0)
            .reduce(f64::min)
    }
}

/// A sailing, booked or not. Booking linkage lives on the cruise itself:
/// a non-empty `reservation_number` means `booking_id == id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cruise {
    pub id:              EntityId,
    pub ship:            String,
    pub line:            String,
    pub itinerary_name:  String,
    pub departure_port:  String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region:          Option<String>,
    pub departure_date:  DateText,
    pub return_date:     DateText,
    pub nights:          i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cabin_type:      Option<String>,
    pub stateroom_types: Vec<String>,
    pub status:          SaleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_status: Option<LifecycleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_cruise_id: Option<String>,

    // Booking linkage, only for real reservations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id:         Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests:             Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_to_go:         Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cabin_number:       Option<String>,

    // Offer linkage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_code:            Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_name:            Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_expiration_date: Option<DateText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value:                 Option<String>,

    // Realized financials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_fare:            Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_fare:          Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_market_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_savings:       Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_savings:    Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_current: Option<PricingSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_lowest:  Option<PricingSnapshot>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Cruise {
    /// Minimal draft for `create_cruise`. Identity and stamps are assigned
    /// by the store.
    pub fn draft(ship: &str, departure_date: &str, nights: i64) -> Self {
        Self {
            ship: ship.to_string(),
            departure_date: departure_date.to_string(),
            nights,
            ..Self::default()
        }
    }

    pub fn has_reservation(&self) -> bool {
        self.reservation_number
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }

    pub fn is_booked(&self) -> bool {
        self.booking_id.is_some()
    }
}

// ── Legacy booked cruise ───────────────────────────────────────────

/// Pre-unification booking record. Superseded by booking-linked cruises;
/// reconciliation promotes unmatched ones into new `Cruise` records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookedCruise {
    pub id:                 EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cruise_id:          Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_cruise_id:   Option<String>,
    pub ship:               String,
    pub itinerary_name:     String,
    pub departure_port:     String,
    pub departure_date:     DateText,
    pub return_date:        DateText,
    pub nights:             i64,
    pub reservation_number: String,
    pub guests:             u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cabin_number:       Option<String>,
    /// Always recomputed from today; never trusted from input.
    pub days_to_go:         i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_status:   Option<LifecycleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_fare:            Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_fare:          Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_market_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_savings:       Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_savings:    Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ── Casino offer ───────────────────────────────────────────────────

/// Created on import, never mutated except by field cleanup, and kept
/// after expiry for historical analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CasinoOffer {
    pub id:             EntityId,
    pub name:           String,
    pub reward_number:  String,
    pub offer_name:     String,
    pub offer_code:     String,
    pub offer_type:     String,
    pub expires:        DateText,
    /// Cash-equivalent value as imported, e.g. "$1,250".
    pub trade_in_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description:    Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub perks:          Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sailing_dates:  Vec<DateText>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ships:          Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CasinoOffer {
    /// Parse the trade-in value string ("$1,250.00") into dollars.
    pub fn trade_in_amount(&self) -> f64 {
        parse_money(&self.trade_in_value).unwrap_or(0.0)
    }
}

// ── Calendar event ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Tripit,
    Booked,
    #[default]
    Manual,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarEvent {
    pub id:          EntityId,
    pub source:      EventSource,
    pub summary:     String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location:    Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date:  DateText,
    pub end_date:    DateText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cruise_id:   Option<EntityId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ── Financials ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinancialSource {
    #[default]
    Receipt,
    Statement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendCategory {
    #[serde(rename = "Food & Beverage")]
    FoodAndBeverage,
    Retail,
    Spa,
    ShoreEx,
    Casino,
    Gratuity,
    #[serde(rename = "Tax/Fees")]
    TaxFees,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    Casino,
    Beverage,
    Dining,
    Photo,
    Spa,
    Retail,
    ShoreEx,
    ServiceFees,
    Taxes,
    Gratuities,
    Other,
}

/// One onboard spending line, from a receipt or a folio statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialsRecord {
    pub id:          EntityId,
    pub cruise_id:   EntityId,
    pub source_type: FinancialSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_name:          Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_date:          Option<DateText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category:           Option<SpendCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department:         Option<Department>,
    /// Finer label inferred from the description, e.g. "free play".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category:       Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_description:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description:        Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_total:         Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax:                Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gratuity:           Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount:           Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount:             Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboard_credit_applied: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_number:         Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folio_number:       Option<String>,
    pub verified:           bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FinancialsRecord {
    /// The charged amount, preferring `amount` over `line_total`.
    pub fn charged(&self) -> f64 {
        self.amount.or(self.line_total).unwrap_or(0.0)
    }

    pub fn is_casino(&self) -> bool {
        self.department == Some(Department::Casino) || self.category == Some(SpendCategory::Casino)
    }
}

// ── Casino analytics cache ─────────────────────────────────────────

/// Inputs and outputs of one ROI/comp calculation for a cruise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CasinoAnalytics {
    pub id:                EntityId,
    pub cruise_id:         EntityId,
    pub cabin_price:       f64,
    pub taxes:             f64,
    pub offer_type:        String,
    pub perks:             Vec<String>,
    pub points:            u64,
    pub retail_value:      f64,
    pub savings:           f64,
    pub out_of_pocket:     f64,
    pub total_value:       f64,
    pub coin_in:           f64,
    pub cost_per_point:    f64,
    pub value_per_point:   f64,
    pub roi:               f64,
    pub reward_tier:       String,
    pub next_cruise_bonus: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ── Casino performance ─────────────────────────────────────────────

/// Self-reported casino results for one sailing. At most one per cruise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CasinoPerformance {
    pub id:            EntityId,
    pub cruise_id:     EntityId,
    pub points_earned: u64,
    pub coin_in:       f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_won:     Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lost:    Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_result:    Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions:      Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes:         Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CasinoPerformance {
    /// Recorded net result, else winnings minus losses when both are known.
    pub fn net(&self) -> Option<f64> {
        self.net_result
            .or_else(|| Some(self.total_won? - self.total_lost?))
    }
}

// ── Certificate ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CertificateKind {
    /// Future cruise credit.
    #[serde(rename = "FCC")]
    Fcc,
    NextCruise,
    #[default]
    #[serde(other)]
    Other,
}

/// A cruise certificate or credit earned through play or a cancellation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Certificate {
    pub id:          EntityId,
    #[serde(rename = "type")]
    pub kind:        CertificateKind,
    pub value:       f64,
    pub earned_date: DateText,
    pub expires_on:  DateText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_cruise_id:  Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_on_cruise_id: Option<EntityId>,
    pub is_used:     bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes:       Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ── User profile ───────────────────────────────────────────────────

/// Loyalty standing. A singleton that survives full data clears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id:                EntityId,
    pub level:             String,
    pub points:            u64,
    pub next_level_points: u64,
    pub total_spent:       f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserProfile {
    pub fn starting(now: Timestamp) -> Self {
        Self {
            id:                uuid::Uuid::new_v4().to_string(),
            level:             "PRIME".to_string(),
            points:            20_720,
            next_level_points: 25_000,
            total_spent:       103_410.0,
            created_at:        now,
            updated_at:        now,
        }
    }
}

/// Parse a loosely formatted dollar string ("$1,250.00", "1250") into a
/// number. Returns None when no digits are present.
pub fn parse_money(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
