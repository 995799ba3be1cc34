//! Import field mapping.
//!
//! Rows arrive already parsed (spreadsheet or JSON export) as loosely typed
//! JSON objects whose keys are whatever headers the source used. Each
//! entity kind has an alias table: canonical field ← ordered header aliases.
//! The first alias with a non-empty value wins.
//!
//! RULE: Dates may arrive as spreadsheet day serials; they are converted to
//! `YYYY-MM-DD` on the way in. Other date text is standardized when it
//! parses and passed through unchanged when it does not.

use crate::error::StoreError;
use crate::model::{BookedCruise, CalendarEvent, CasinoOffer, Cruise, EventSource};
use crate::reconcile::{self, BookingFix};
use crate::store::{RecordStore, RowError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

pub const CRUISE_FIELDS: AliasTable = &[
    ("departureDate", &["Sailing Date", "Departure Date", "departureDate", "sailingDate", "startDate"]),
    ("ship", &["Ship Name", "Ship", "ship", "shipName"]),
    ("itineraryName", &["Itinerary", "Itinerary Name", "itineraryName", "itinerary"]),
    ("departurePort", &["Departure Port", "departurePort", "Port"]),
    ("nights", &["Nights", "nights"]),
    ("line", &["Line", "Cruise Line", "line"]),
    ("region", &["Region", "region"]),
    ("cabinType", &["Cabin Type", "Room Type", "cabinType", "roomType"]),
    ("offerName", &["Offer Name", "OFFER NAME", "offerName"]),
    ("offerCode", &["Offer Code", "OFFER CODE", "offerCode"]),
    ("offerExpirationDate", &["OFFER EXPIRE DATE", "Offer Expiry Date", "offerExpirationDate"]),
    ("value", &["Value", "value"]),
    ("reservationNumber", &["Reservation #", "Reservation Number", "reservationNumber"]),
    ("guests", &["# of Guests", "Guests", "guests"]),
];

pub const BOOKED_FIELDS: AliasTable = &[
    ("departureDate", &["Start Date", "Departure Date", "Sailing Date", "startDate", "departureDate"]),
    ("returnDate", &["End Date", "Return Date", "endDate", "returnDate"]),
    ("ship", &["Ship", "Ship Name", "ship"]),
    ("itineraryName", &["Itinerary Name", "Itinerary", "itineraryName"]),
    ("departurePort", &["Departure Port", "departurePort"]),
    ("nights", &["Nights", "nights"]),
    ("reservationNumber", &["Reservation #", "Reservation Number", "reservationNumber"]),
    ("guests", &["Guests", "guests"]),
    ("cabinNumber", &["Cabin #", "Cabin Number", "cabinNumber"]),
    ("paidFare", &["Paid Fare", "paidFare"]),
    ("actualFare", &["Actual Fare", "actualFare"]),
];

pub const OFFER_FIELDS: AliasTable = &[
    ("name", &["NAME", "Name", "name"]),
    ("rewardNumber", &["REWARD NUMBER", "Reward Number", "rewardNumber"]),
    ("offerName", &["OFFER NAME", "Offer Name", "offerName"]),
    ("offerType", &["OFFER TYPE", "Offer Type", "Offer Type / Category", "offerType"]),
    ("expires", &["EXPIRES", "Expires", "Offer Expiry Date", "expires"]),
    ("offerCode", &["OFFER CODE", "Offer Code", "offerCode"]),
    ("tradeInValue", &["TRADE IN VALUE", "Trade In Value", "Trade-In Value", "tradeInValue"]),
    ("description", &["Description", "description"]),
    ("perks", &["Perks", "perks"]),
    ("sailingDate", &["Sailing Date", "sailingDate"]),
    ("ship", &["Ship Name", "shipName"]),
];

pub const CALENDAR_FIELDS: AliasTable = &[
    ("summary", &["Summary", "Title", "summary"]),
    ("startDate", &["Start Date", "startDate", "Date"]),
    ("endDate", &["End Date", "endDate"]),
    ("location", &["Location", "location"]),
    ("description", &["Description", "description"]),
    ("source", &["Source", "source"]),
];

/// Entity kind of an import sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    Cruises,
    Booked,
    CasinoOffers,
    Calendar,
}

impl SheetKind {
    pub fn aliases(self) -> AliasTable {
        match self {
            Self::Cruises      => CRUISE_FIELDS,
            Self::Booked       => BOOKED_FIELDS,
            Self::CasinoOffers => OFFER_FIELDS,
            Self::Calendar     => CALENDAR_FIELDS,
        }
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Project a raw row onto canonical field names. Unknown headers are dropped.
pub fn map_row(kind: SheetKind, row: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (field, aliases) in kind.aliases() {
        let found = aliases
            .iter()
            .filter_map(|alias| row.get(*alias))
            .find(|v| !is_blank(v));
        if let Some(v) = found {
            out.insert((*field).to_string(), v.clone());
        }
    }
    out
}

// ── Value coercion ─────────────────────────────────────────────────

/// Spreadsheet day serial (1900 date system) to a calendar date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial <= 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(chrono::Days::new(serial.floor() as u64))
}

fn text(row: &Map<String, Value>, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn date(row: &Map<String, Value>, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::Number(n) => n
            .as_f64()
            .and_then(serial_to_date)
            .map(|d| d.format("%Y-%m-%d").to_string()),
        _ => {
            let raw = text(row, field)?;
            Some(reconcile::standardize_date(&raw).unwrap_or(raw))
        }
    }
}

fn number(row: &Map<String, Value>, field: &str) -> Option<f64> {
    match row.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => crate::model::parse_money(s),
        _ => None,
    }
}

fn integer(row: &Map<String, Value>, field: &str) -> Option<i64> {
    number(row, field).map(|n| n.trunc() as i64)
}

fn list(row: &Map<String, Value>, field: &str) -> Vec<String> {
    match row.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(String::from))
            .collect(),
        _ => text(row, field)
            .map(|s| {
                s.split([';', '|', '\n'])
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn nights_for(row: &Map<String, Value>, itinerary: &str) -> i64 {
    integer(row, "nights")
        .filter(|n| *n > 0)
        .or_else(|| reconcile::extract_nights(itinerary))
        .unwrap_or(reconcile::DEFAULT_NIGHTS)
}

// ── Row → entity ───────────────────────────────────────────────────

pub fn cruise_from_row(row: &Map<String, Value>) -> Cruise {
    let itinerary_name = text(row, "itineraryName").unwrap_or_default();
    Cruise {
        departure_date:        date(row, "departureDate").unwrap_or_default(),
        ship:                  text(row, "ship").unwrap_or_default(),
        nights:                nights_for(row, &itinerary_name),
        itinerary_name,
        departure_port:        text(row, "departurePort").unwrap_or_default(),
        line:                  text(row, "line").unwrap_or_else(|| "Royal Caribbean".to_string()),
        region:                text(row, "region"),
        cabin_type:            text(row, "cabinType"),
        offer_name:            text(row, "offerName"),
        offer_code:            text(row, "offerCode"),
        offer_expiration_date: date(row, "offerExpirationDate"),
        value:                 text(row, "value"),
        reservation_number:    text(row, "reservationNumber"),
        guests:                integer(row, "guests").and_then(|g| u32::try_from(g).ok()),
        ..Cruise::default()
    }
}

pub fn booked_from_row(row: &Map<String, Value>) -> BookedCruise {
    let itinerary_name = text(row, "itineraryName").unwrap_or_default();
    let departure_date = date(row, "departureDate").unwrap_or_default();
    BookedCruise {
        return_date:        date(row, "returnDate").unwrap_or_else(|| departure_date.clone()),
        departure_date,
        ship:               text(row, "ship").unwrap_or_default(),
        nights:             nights_for(row, &itinerary_name),
        itinerary_name,
        departure_port:     text(row, "departurePort").unwrap_or_default(),
        reservation_number: text(row, "reservationNumber").unwrap_or_default(),
        guests:             integer(row, "guests").and_then(|g| u32::try_from(g).ok()).unwrap_or(1),
        cabin_number:       text(row, "cabinNumber"),
        paid_fare:          number(row, "paidFare"),
        actual_fare:        number(row, "actualFare"),
        ..BookedCruise::default()
    }
}

/// Offer rows in the per-sailing layout also carry the ship and sailing
/// date the offer applies to.
pub fn offer_from_row(row: &Map<String, Value>) -> CasinoOffer {
    CasinoOffer {
        name:           text(row, "name").unwrap_or_default(),
        reward_number:  text(row, "rewardNumber").unwrap_or_default(),
        offer_name:     text(row, "offerName").unwrap_or_default(),
        offer_code:     text(row, "offerCode").unwrap_or_default(),
        offer_type:     text(row, "offerType").unwrap_or_default(),
        expires:        date(row, "expires").unwrap_or_default(),
        trade_in_value: text(row, "tradeInValue").unwrap_or_else(|| "$0".to_string()),
        description:    text(row, "description"),
        perks:          list(row, "perks"),
        sailing_dates:  date(row, "sailingDate").into_iter().collect(),
        ships:          text(row, "ship").into_iter().collect(),
        ..CasinoOffer::default()
    }
}

pub fn event_from_row(row: &Map<String, Value>) -> CalendarEvent {
    let source = text(row, "source")
        .and_then(|s| serde_json::from_value(Value::String(s.to_lowercase())).ok())
        .unwrap_or(EventSource::Manual);
    CalendarEvent {
        source,
        summary:     text(row, "summary").unwrap_or_else(|| "Event".to_string()),
        start_date:  date(row, "startDate").unwrap_or_default(),
        end_date:    date(row, "endDate").unwrap_or_default(),
        location:    text(row, "location"),
        description: text(row, "description"),
        ..CalendarEvent::default()
    }
}

// ── Store operations ───────────────────────────────────────────────

/// Result of importing one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub created: usize,
    pub errors:  Vec<RowError>,
    pub booking: BookingFix,
}

/// All four sheets of a combined import.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportBatch {
    pub cruises:  Vec<Value>,
    pub booked:   Vec<Value>,
    pub offers:   Vec<Value>,
    pub calendar: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub cruises: ImportOutcome,
    pub booked:  ImportOutcome,
    pub offers:  ImportOutcome,
    pub events:  ImportOutcome,
}

/// Map every row, setting aside the ones that are not JSON objects.
fn mapped_rows(kind: SheetKind, rows: &[Value]) -> (Vec<(usize, Map<String, Value>)>, Vec<RowError>) {
    let mut mapped = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        match row.as_object() {
            Some(obj) => mapped.push((index, map_row(kind, obj))),
            None => errors.push(RowError {
                index,
                message: format!("Row {}: {}", index + 1, StoreError::InvalidInput("row is not an object".into())),
            }),
        }
    }
    (mapped, errors)
}

/// Bulk paths report indices into the filtered batch; map them back.
fn reindex(errors: Vec<RowError>, positions: &[usize]) -> impl Iterator<Item = RowError> + '_ {
    errors.into_iter().map(move |e| RowError {
        index:   positions.get(e.index).copied().unwrap_or(e.index),
        message: e.message,
    })
}

impl RecordStore {
    fn finish_import(&mut self, sheet: &str, mut outcome: ImportOutcome) -> ImportOutcome {
        outcome.errors.sort_by_key(|e| e.index);
        outcome.booking = self.fix_booking_ids();
        self.mark_imported();
        log::info!(
            "import: {sheet} created={} rejected={} promoted={}",
            outcome.created, outcome.errors.len(), outcome.booking.promoted
        );
        outcome
    }

    pub fn import_cruise_rows(&mut self, rows: &[Value]) -> ImportOutcome {
        let (mapped, mut errors) = mapped_rows(SheetKind::Cruises, rows);
        let positions: Vec<usize> = mapped.iter().map(|(i, _)| *i).collect();
        let drafts = mapped.iter().map(|(_, r)| cruise_from_row(r)).collect();
        let bulk = self.bulk_create_cruises(drafts);
        errors.extend(reindex(bulk.errors, &positions));
        self.finish_import("cruises", ImportOutcome { created: bulk.created.len(), errors, ..Default::default() })
    }

    /// Legacy booking rows need a departure date; everything else defaults.
    pub fn import_booked_rows(&mut self, rows: &[Value]) -> ImportOutcome {
        let (mapped, mut errors) = mapped_rows(SheetKind::Booked, rows);
        let mut drafts = Vec::with_capacity(mapped.len());
        for (index, row) in &mapped {
            let draft = booked_from_row(row);
            if draft.departure_date.is_empty() {
                let e = StoreError::MissingField { entity: "booked cruise", field: "departureDate" };
                errors.push(RowError { index: *index, message: format!("Booked cruise {}: {e}", index + 1) });
                continue;
            }
            drafts.push(draft);
        }
        let bulk = self.bulk_create_booked_cruises(drafts);
        self.finish_import("booked", ImportOutcome { created: bulk.created.len(), errors, ..Default::default() })
    }

    pub fn import_offer_rows(&mut self, rows: &[Value]) -> ImportOutcome {
        let (mapped, errors) = mapped_rows(SheetKind::CasinoOffers, rows);
        let drafts = mapped.iter().map(|(_, r)| offer_from_row(r)).collect();
        let bulk = self.bulk_create_casino_offers(drafts);
        self.finish_import("offers", ImportOutcome { created: bulk.created.len(), errors, ..Default::default() })
    }

    pub fn import_calendar_rows(&mut self, rows: &[Value]) -> ImportOutcome {
        let (mapped, mut errors) = mapped_rows(SheetKind::Calendar, rows);
        let positions: Vec<usize> = mapped.iter().map(|(i, _)| *i).collect();
        let drafts = mapped.iter().map(|(_, r)| event_from_row(r)).collect();
        let bulk = self.bulk_create_calendar_events(drafts);
        errors.extend(reindex(bulk.errors, &positions));
        self.finish_import("calendar", ImportOutcome { created: bulk.created.len(), errors, ..Default::default() })
    }

    /// Import every sheet of a batch. Cruises land before legacy bookings
    /// so promotion only creates cruises for bookings with no match.
    pub fn import_batch(&mut self, batch: &ImportBatch) -> ImportSummary {
        let offers = self.import_offer_rows(&batch.offers);
        let events = self.import_calendar_rows(&batch.calendar);
        let cruises = self.import_cruise_rows(&batch.cruises);
        let booked = self.import_booked_rows(&batch.booked);
        ImportSummary { cruises, booked, offers, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_non_empty_alias_wins() {
        let row = json!({ "Ship Name": "", "Ship": "Wonder of the Seas", "Junk": 1 });
        let mapped = map_row(SheetKind::Cruises, row.as_object().unwrap());
        assert_eq!(mapped.get("ship"), Some(&json!("Wonder of the Seas")));
        assert!(!mapped.contains_key("Junk"));
    }

    #[test]
    fn spreadsheet_serials_become_dates() {
        assert_eq!(serial_to_date(45_658.0), NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(serial_to_date(0.0), None);
    }
}
