//! Reconciliation — pure fix-ups over imported entities.
//!
//! RULE: Every function here is idempotent. Running a pass over data it has
//! already cleaned changes nothing, because the store runs it on every load
//! and after every repair.
//!
//! RULE: Reconciliation never fails. Unparseable or out-of-range dates are
//! left exactly as they were; nothing is guessed.
//!
//! Functions report whether they changed a record; the caller stamps
//! `updatedAt` on changed records only.

use crate::model::{
    BookedCruise, CalendarEvent, CasinoOffer, Cruise, Department, FinancialsRecord,
    LifecycleStatus, SpendCategory,
};
use crate::types::Timestamp;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Travel dates outside this window are treated as parse errors.
pub const MIN_TRAVEL_YEAR: i32 = 2020;
pub const MAX_TRAVEL_YEAR: i32 = 2030;

/// Accepted range for nights pulled out of itinerary text.
pub const MAX_INFERRED_NIGHTS: i64 = 21;

/// Nights assumed for promoted legacy bookings and price estimates when
/// the record has none.
pub const DEFAULT_NIGHTS: i64 = 7;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid regex"));
static US_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("valid regex"));
static YMD_LOOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})[/-](\d{1,2})[/-](\d{1,2})$").expect("valid regex"));

static NIGHT_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(\d+)\s*[Nn]ight").expect("valid regex"),
        Regex::new(r"(\d+)\s*-\s*[Nn]ight").expect("valid regex"),
        Regex::new(r"(\d+)\s*[Nn]t").expect("valid regex"),
    ]
});
static HAS_NIGHT_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*-?\s*[Nn]ight").expect("valid regex"));
static NAN_NIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bNaN\s*nights?\b").expect("valid regex"));

static GLYPHS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[®™©]").expect("valid regex"));
static BRACKET_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["']"#).expect("valid regex"));

// ── Dates ──────────────────────────────────────────────────────────

const FREE_FORM_DATES: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%a, %d %b %Y",
    "%A, %B %d, %Y",
    "%a %b %d %Y",
];

const FREE_FORM_DATETIMES: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Parse any accepted date shape into a calendar date, without the travel
/// year check. Datetimes keep the calendar day as written.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(c) = ISO_DATE.captures(text) {
        return ymd(&c[1], &c[2], &c[3]);
    }
    if let Some(c) = US_DATE.captures(text) {
        return ymd(&c[3], &c[1], &c[2]);
    }
    if let Some(c) = YMD_LOOSE.captures(text) {
        return ymd(&c[1], &c[2], &c[3]);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local().date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_local().date());
    }
    for fmt in FREE_FORM_DATETIMES {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    FREE_FORM_DATES
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Standardize a date to ISO `YYYY-MM-DD`. None when the text does not
/// parse or the year falls outside the plausible travel window.
pub fn standardize_date(text: &str) -> Option<String> {
    let date = parse_date(text)?;
    let year = chrono::Datelike::year(&date);
    if !(MIN_TRAVEL_YEAR..=MAX_TRAVEL_YEAR).contains(&year) {
        return None;
    }
    Some(date.format("%Y-%m-%d").to_string())
}

/// `departure + nights` as an ISO date.
pub fn return_date_for(departure: &str, nights: i64) -> Option<String> {
    let dep = parse_date(departure)?;
    let ret = dep.checked_add_signed(Duration::days(nights))?;
    Some(ret.format("%Y-%m-%d").to_string())
}

/// Normalize a date field in place. Returns true on change.
fn standardize_field(field: &mut String) -> bool {
    match standardize_date(field) {
        Some(iso) if iso != *field => {
            *field = iso;
            true
        }
        _ => false,
    }
}

/// Comparable day key: the standardized date, else the first ten
/// characters of the raw text.
pub fn day_key(text: &str) -> String {
    standardize_date(text).unwrap_or_else(|| text.trim().get(..10).unwrap_or(text.trim()).to_string())
}

// ── Text ───────────────────────────────────────────────────────────

/// Strip trademark glyphs and bracketed tags, collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let no_glyphs = GLYPHS.replace_all(text, "");
    let no_tags = BRACKET_TAG.replace_all(&no_glyphs, " ");
    WHITESPACE.replace_all(&no_tags, " ").trim().to_string()
}

/// Night count mentioned in itinerary text, when it is plausible.
pub fn extract_nights(itinerary: &str) -> Option<i64> {
    NIGHT_PATTERNS.iter().find_map(|re| {
        let n: i64 = re.captures(itinerary)?[1].parse().ok()?;
        (1..=MAX_INFERRED_NIGHTS).contains(&n).then_some(n)
    })
}

/// Drop `NaN night` artifacts and prefix the night count when the text
/// does not already carry one.
pub fn clean_itinerary(itinerary: &str, nights: i64) -> String {
    let stripped = NAN_NIGHT.replace_all(itinerary, "");
    let cleaned = clean_text(&stripped);
    if nights > 0 && !cleaned.is_empty() && !HAS_NIGHT_COUNT.is_match(&cleaned) {
        return format!("{nights} Night {cleaned}");
    }
    cleaned
}

pub fn clean_port(port: &str) -> String {
    let unquoted = QUOTES.replace_all(port, "");
    WHITESPACE.replace_all(&unquoted, " ").trim().to_string()
}

fn replace_if_changed(field: &mut String, cleaned: String) -> bool {
    if cleaned != *field {
        *field = cleaned;
        true
    } else {
        false
    }
}

// ── Fare estimate ──────────────────────────────────────────────────

fn ship_base_rate(ship: &str) -> f64 {
    let ship = ship.to_lowercase();
    if ship.contains("star of the seas") {
        180.0
    } else if ship.contains("wonder of the seas") || ship.contains("symphony of the seas") {
        160.0
    } else if ["harmony", "allure", "oasis"].iter().any(|s| ship.contains(s)) {
        140.0
    } else if ["voyager", "mariner", "navigator"].iter().any(|s| ship.contains(s)) {
        120.0
    } else {
        100.0
    }
}

fn cabin_multiplier(cabin: &str) -> f64 {
    match cabin.trim().to_lowercase().as_str() {
        "oceanview"    => 1.3,
        "balcony"      => 1.8,
        "suite"        => 3.2,
        "junior suite" => 2.8,
        "grand suite"  => 4.5,
        _              => 1.0,
    }
}

/// Estimated double-occupancy fare including taxes and fees.
pub fn estimate_fare(ship: &str, nights: i64, cabin: &str) -> f64 {
    let fare = (ship_base_rate(ship) * nights as f64 * cabin_multiplier(cabin) * 2.0).round();
    (fare * 1.15).round()
}

// ── Lifecycle ──────────────────────────────────────────────────────

/// Status of a sailing window relative to `today`. None when the departure
/// date does not parse.
pub fn lifecycle_for(departure: &str, return_date: &str, today: NaiveDate) -> Option<LifecycleStatus> {
    let start = parse_date(departure)?;
    match parse_date(return_date) {
        Some(end) if today > end    => Some(LifecycleStatus::Completed),
        Some(_) if today >= start   => Some(LifecycleStatus::InProgress),
        Some(_)                     => Some(LifecycleStatus::Upcoming),
        None if today > start       => Some(LifecycleStatus::Completed),
        None                        => Some(LifecycleStatus::Upcoming),
    }
}

/// Whole days from `today` until departure, floored at zero.
pub fn days_to_go(departure: &str, today: NaiveDate) -> Option<i64> {
    let dep = parse_date(departure)?;
    Some((dep - today).num_days().max(0))
}

/// Recompute lifecycle over both cruise collections, and days-to-go for
/// legacy bookings. Records that change get `updatedAt = now`. Returns the
/// number of changed records.
pub fn apply_lifecycle(
    cruises: &mut [Cruise],
    booked:  &mut [BookedCruise],
    today:   NaiveDate,
    now:     Timestamp,
) -> usize {
    let mut changed = 0;
    for c in cruises.iter_mut() {
        if let Some(status) = lifecycle_for(&c.departure_date, &c.return_date, today) {
            if c.lifecycle_status != Some(status) {
                c.lifecycle_status = Some(status);
                c.updated_at = now;
                changed += 1;
            }
        }
    }
    for b in booked.iter_mut() {
        let mut touched = false;
        if let Some(status) = lifecycle_for(&b.departure_date, &b.return_date, today) {
            if b.lifecycle_status != Some(status) {
                b.lifecycle_status = Some(status);
                touched = true;
            }
        }
        if let Some(days) = days_to_go(&b.departure_date, today) {
            if b.days_to_go != days {
                b.days_to_go = days;
                touched = true;
            }
        }
        if touched {
            b.updated_at = now;
            changed += 1;
        }
    }
    changed
}

// ── Per-entity passes ──────────────────────────────────────────────

/// Shared date/nights repair for anything with a sailing window.
fn repair_window(
    departure:   &mut String,
    return_date: &mut String,
    nights:      &mut i64,
    itinerary:   &str,
) -> bool {
    let mut changed = false;

    if *nights <= 0 {
        if let Some(n) = extract_nights(itinerary) {
            *nights = n;
            changed = true;
        }
    }

    changed |= standardize_field(departure);

    let departure_ok = standardize_date(departure).is_some();
    if departure_ok && *nights > 0 {
        // Any calendar-day mismatch counts as drift.
        if let Some(expected) = return_date_for(departure, *nights) {
            changed |= replace_if_changed(return_date, expected);
        }
    } else {
        changed |= standardize_field(return_date);
    }
    changed
}

/// Date and nights repair for one cruise: ISO departure, nights from the
/// itinerary when missing, and `returnDate = departure + nights`.
pub fn repair_cruise_window(c: &mut Cruise) -> bool {
    let itinerary = c.itinerary_name.clone();
    repair_window(&mut c.departure_date, &mut c.return_date, &mut c.nights, &itinerary)
}

/// The same window repair for a legacy booking.
pub fn repair_booked_window(b: &mut BookedCruise) -> bool {
    let itinerary = b.itinerary_name.clone();
    repair_window(&mut b.departure_date, &mut b.return_date, &mut b.nights, &itinerary)
}

/// Full cleanup of one cruise. Returns true when anything changed.
pub fn fix_cruise(c: &mut Cruise) -> bool {
    let ship = clean_text(&c.ship);
    let mut changed = replace_if_changed(&mut c.ship, ship);

    changed |= repair_cruise_window(c);
    let itinerary = c.itinerary_name.clone();

    changed |= replace_if_changed(&mut c.itinerary_name, clean_itinerary(&itinerary, c.nights));
    let port = clean_port(&c.departure_port);
    changed |= replace_if_changed(&mut c.departure_port, port);

    if let Some(exp) = c.offer_expiration_date.as_mut() {
        changed |= standardize_field(exp);
    }

    let missing_value = c
        .value
        .as_deref()
        .map(|v| v.trim().is_empty() || v.trim() == "0")
        .unwrap_or(true);
    if missing_value {
        let nights = if c.nights > 0 { c.nights } else { DEFAULT_NIGHTS };
        let cabin = c.cabin_type.as_deref().unwrap_or("Interior");
        let estimate = estimate_fare(&c.ship, nights, cabin);
        c.value = Some(format!("{estimate:.0}"));
        changed = true;
    }
    changed
}

/// Cleanup of one legacy booking, including days-to-go against `today`.
pub fn fix_booked(b: &mut BookedCruise, today: NaiveDate) -> bool {
    let ship = clean_text(&b.ship);
    let mut changed = replace_if_changed(&mut b.ship, ship);

    changed |= repair_booked_window(b);
    let itinerary = b.itinerary_name.clone();

    changed |= replace_if_changed(&mut b.itinerary_name, clean_itinerary(&itinerary, b.nights));
    let port = clean_port(&b.departure_port);
    changed |= replace_if_changed(&mut b.departure_port, port);

    if let Some(days) = days_to_go(&b.departure_date, today) {
        if days != b.days_to_go {
            b.days_to_go = days;
            changed = true;
        }
    }

    if b.current_market_price.map_or(true, |p| p == 0.0) {
        let nights = if b.nights > 0 { b.nights } else { DEFAULT_NIGHTS };
        b.current_market_price = Some(estimate_fare(&b.ship, nights, "Interior"));
        changed = true;
    }
    changed
}

pub fn fix_offer(o: &mut CasinoOffer) -> bool {
    let mut changed = standardize_field(&mut o.expires);
    for date in o.sailing_dates.iter_mut() {
        changed |= standardize_field(date);
    }
    for ship in o.ships.iter_mut() {
        let cleaned = clean_text(ship);
        changed |= replace_if_changed(ship, cleaned);
    }
    changed
}

pub fn fix_event(e: &mut CalendarEvent) -> bool {
    let summary = clean_text(&e.summary);
    let mut changed = replace_if_changed(&mut e.summary, summary);
    changed |= standardize_field(&mut e.start_date);
    changed |= standardize_field(&mut e.end_date);
    changed
}

// ── Financials classification ──────────────────────────────────────

static DEPT_RULES: LazyLock<Vec<(Regex, Department)>> = LazyLock::new(|| {
    [
        (r"casino|gaming|club\s?royale", Department::Casino),
        (r"beverage|bar|cafe|starbucks|coconut", Department::Beverage),
        (r"dining|restaurant|izumi|hooked|chef", Department::Dining),
        (r"photo", Department::Photo),
        (r"spa|salon|vitality", Department::Spa),
        (r"retail|shop|solera|duty", Department::Retail),
        (r"shore.*ex|excursion", Department::ShoreEx),
        (r"service.*fee|wow.?band", Department::ServiceFees),
        (r"tax", Department::Taxes),
        (r"gratu", Department::Gratuities),
    ]
    .into_iter()
    .map(|(p, d)| (Regex::new(p).expect("valid regex"), d))
    .collect()
});

static CATEGORY_RULES: LazyLock<Vec<(Regex, SpendCategory)>> = LazyLock::new(|| {
    [
        (r"casino|gaming|club\s?royale", SpendCategory::Casino),
        (r"food|dining|restaurant|chef|izumi|hooked", SpendCategory::FoodAndBeverage),
        (r"beverage|bar|cafe|coffee|drink", SpendCategory::FoodAndBeverage),
        (r"spa|salon|vitality", SpendCategory::Spa),
        (r"retail|shop|duty|photo", SpendCategory::Retail),
        (r"shore.*ex|excursion", SpendCategory::ShoreEx),
        (r"gratu", SpendCategory::Gratuity),
        (r"tax|fee", SpendCategory::TaxFees),
    ]
    .into_iter()
    .map(|(p, c)| (Regex::new(p).expect("valid regex"), c))
    .collect()
});

static FREE_PLAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)free\s*play").expect("valid regex"));
static ONBOARD_CREDIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on.?board\s?credit|obc").expect("valid regex"));
static REF_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ref\s?#?([A-Z0-9\-]+)").expect("valid regex"));
static FOLIO_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)folio\s?#?([A-Z0-9\-]+)").expect("valid regex"));

pub fn classify_department(text: &str) -> Option<Department> {
    let s = text.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    Some(
        DEPT_RULES
            .iter()
            .find(|(re, _)| re.is_match(&s))
            .map(|(_, d)| *d)
            .unwrap_or(Department::Other),
    )
}

pub fn classify_category(text: &str) -> Option<SpendCategory> {
    let s = text.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    Some(
        CATEGORY_RULES
            .iter()
            .find(|(re, _)| re.is_match(&s))
            .map(|(_, c)| *c)
            .unwrap_or(SpendCategory::Other),
    )
}

/// Fill derived fields from the line's free text. Only empty fields are
/// filled, so a second pass is a no-op.
pub fn classify_financial(r: &mut FinancialsRecord) -> bool {
    let text = r
        .item_description
        .clone()
        .or_else(|| r.description.clone())
        .unwrap_or_default();
    let description = r.description.clone().unwrap_or_else(|| text.clone());
    let mut changed = false;

    if r.category.is_none() {
        if let Some(cat) = classify_category(&text) {
            r.category = Some(cat);
            changed = true;
        }
    }
    if r.department.is_none() {
        if let Some(dept) = classify_department(&text) {
            r.department = Some(dept);
            changed = true;
        }
    }
    if r.sub_category.is_none() && (FREE_PLAY.is_match(&text) || FREE_PLAY.is_match(&description)) {
        r.sub_category = Some("free play".to_string());
        changed = true;
    }
    if r.onboard_credit_applied.is_none() && ONBOARD_CREDIT.is_match(&description) {
        if let Some(amount) = r.amount.or(r.line_total) {
            r.onboard_credit_applied = Some(amount.abs());
            changed = true;
        }
    }
    if r.ref_number.is_none() {
        if let Some(c) = REF_NUMBER.captures(&description) {
            r.ref_number = Some(c[1].to_string());
            changed = true;
        }
    }
    if r.folio_number.is_none() {
        if let Some(c) = FOLIO_NUMBER.captures(&description) {
            r.folio_number = Some(c[1].to_string());
            changed = true;
        }
    }
    changed
}

// ── Booking linkage ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFix {
    /// Cruises whose booking fields were set or cleared.
    pub updated:  usize,
    /// New cruises promoted from unmatched legacy bookings.
    pub promoted: usize,
}

/// Same reservation, ship and sailing day. Both sides are compared in
/// cleaned form, so raw imported text still matches its unified cruise.
fn is_legacy_match(c: &Cruise, b: &BookedCruise) -> bool {
    c.reservation_number.as_deref().map(str::trim) == Some(b.reservation_number.trim())
        && clean_text(&c.ship).to_lowercase() == clean_text(&b.ship).to_lowercase()
        && day_key(&c.departure_date) == day_key(&b.departure_date)
}

fn promote_legacy(b: &BookedCruise, now: Timestamp) -> Cruise {
    let id = uuid::Uuid::new_v4().to_string();
    let nights = if b.nights > 0 {
        b.nights
    } else {
        extract_nights(&b.itinerary_name).unwrap_or(DEFAULT_NIGHTS)
    };
    let mut c = Cruise {
        id:                 id.clone(),
        ship:               clean_text(&b.ship),
        line:               "Royal Caribbean".to_string(),
        itinerary_name:     b.itinerary_name.clone(),
        departure_port:     b.departure_port.clone(),
        departure_date:     standardize_date(&b.departure_date).unwrap_or_else(|| b.departure_date.clone()),
        return_date:        standardize_date(&b.return_date).unwrap_or_else(|| b.return_date.clone()),
        nights,
        stateroom_types:    vec!["Interior".to_string()],
        unique_cruise_id:   b.unique_cruise_id.clone(),
        booking_id:         Some(id),
        reservation_number: Some(b.reservation_number.trim().to_string()),
        guests:             (b.guests > 0).then_some(b.guests),
        cabin_number:       b.cabin_number.clone(),
        paid_fare:          b.paid_fare,
        actual_fare:        b.actual_fare,
        actual_savings:     b.actual_savings,
        projected_savings:  b.projected_savings,
        created_at:         now,
        updated_at:         now,
        ..Cruise::default()
    };
    fix_cruise(&mut c);
    c
}

/// Enforce `reservationNumber non-empty ⟺ bookingId == id` over every
/// cruise, then promote legacy bookings that have no unified counterpart.
pub fn fix_booking_ids(cruises: &mut Vec<Cruise>, legacy: &[BookedCruise], now: Timestamp) -> BookingFix {
    let mut fix = BookingFix::default();

    for c in cruises.iter_mut() {
        if c.has_reservation() {
            if c.booking_id.as_deref() != Some(c.id.as_str()) {
                c.booking_id = Some(c.id.clone());
                c.updated_at = now;
                fix.updated += 1;
            }
        } else if c.booking_id.is_some() || c.guests.is_some() || c.days_to_go.is_some() {
            c.booking_id = None;
            c.guests = None;
            c.days_to_go = None;
            c.updated_at = now;
            fix.updated += 1;
        }
    }

    for b in legacy.iter().filter(|b| !b.reservation_number.trim().is_empty()) {
        if cruises.iter().any(|c| is_legacy_match(c, b)) {
            continue;
        }
        let promoted = promote_legacy(b, now);
        log::info!(
            "reconcile: promoted legacy booking {} ({} {}) to cruise {}",
            b.reservation_number, promoted.ship, promoted.departure_date, promoted.id
        );
        cruises.push(promoted);
        fix.promoted += 1;
    }

    fix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_shapes_standardize() {
        assert_eq!(standardize_date("2025-03-01").as_deref(), Some("2025-03-01"));
        assert_eq!(standardize_date("3/1/2025").as_deref(), Some("2025-03-01"));
        assert_eq!(standardize_date("03-01-2025").as_deref(), Some("2025-03-01"));
        assert_eq!(standardize_date("2025/3/1").as_deref(), Some("2025-03-01"));
        assert_eq!(standardize_date("March 1, 2025").as_deref(), Some("2025-03-01"));
        assert_eq!(standardize_date("2025-03-01T23:30:00").as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn out_of_window_years_are_rejected() {
        assert_eq!(standardize_date("1/1/1999"), None);
        assert_eq!(standardize_date("2031-01-01"), None);
        assert_eq!(standardize_date("not a date"), None);
        assert_eq!(standardize_date(""), None);
    }

    #[test]
    fn nights_from_itinerary() {
        assert_eq!(extract_nights("7 Night Western Caribbean"), Some(7));
        assert_eq!(extract_nights("10-Night Transatlantic"), Some(10));
        assert_eq!(extract_nights("5Nt Bahamas"), Some(5));
        assert_eq!(extract_nights("30 Night World"), None);
        assert_eq!(extract_nights("Perfect Day"), None);
    }

    #[test]
    fn text_cleanup_is_stable() {
        let once = clean_text("Wonder of the Seas®  [R] ");
        assert_eq!(once, "Wonder of the Seas");
        assert_eq!(clean_text(&once), once);

        let it = clean_itinerary("NaN night Western  Caribbean", 7);
        assert_eq!(it, "7 Night Western Caribbean");
        assert_eq!(clean_itinerary(&it, 7), it);

        assert_eq!(clean_port("\"Miami,  Florida\""), "Miami, Florida");
    }

    #[test]
    fn fare_estimate_follows_ship_and_cabin() {
        // 100 * 7 * 1.0 * 2 = 1400, * 1.15 = 1610
        assert_eq!(estimate_fare("Liberty", 7, "Interior"), 1610.0);
        // 180 * 4 * 1.8 * 2 = 2592, * 1.15 = 2980.8 -> 2981
        assert_eq!(estimate_fare("Star of the Seas", 4, "Balcony"), 2981.0);
    }

    #[test]
    fn lifecycle_windows() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(lifecycle_for("2025-03-01", "2025-03-08", today), Some(LifecycleStatus::InProgress));
        assert_eq!(lifecycle_for("2025-03-06", "2025-03-08", today), Some(LifecycleStatus::Upcoming));
        assert_eq!(lifecycle_for("2025-02-01", "2025-02-08", today), Some(LifecycleStatus::Completed));
        assert_eq!(lifecycle_for("2025-03-04", "", today), Some(LifecycleStatus::Completed));
        assert_eq!(lifecycle_for("garbage", "", today), None);
    }

    #[test]
    fn financial_lines_are_classified_once() {
        let mut r = FinancialsRecord {
            item_description: Some("Club Royale free play".into()),
            description: Some("Onboard credit applied ref #AB-12 folio 998".into()),
            amount: Some(-150.0),
            ..FinancialsRecord::default()
        };
        assert!(classify_financial(&mut r));
        assert_eq!(r.department, Some(Department::Casino));
        assert_eq!(r.category, Some(SpendCategory::Casino));
        assert_eq!(r.sub_category.as_deref(), Some("free play"));
        assert_eq!(r.onboard_credit_applied, Some(150.0));
        assert_eq!(r.ref_number.as_deref(), Some("AB-12"));
        assert_eq!(r.folio_number.as_deref(), Some("998"));
        assert!(!classify_financial(&mut r));
    }
}
