//! Record store — the in-memory owner of every entity collection.
//!
//! RULE: Only the store mutates collections. Analytics reads them and
//! writes nothing but its own cache through `upsert_casino_analytics`.
//!
//! RULE: Every mutation stamps `updatedAt` from the store clock and calls
//! `touch()`, which schedules a debounced write. Cruise and legacy booking
//! mutations also recompute lifecycle status over the whole collection.
//!
//! Lifecycle: `RecordStore::new` → `load()` → ready. Nothing reads the
//! persisted document after `load()`.

mod booked;
mod calendar;
mod certificate;
mod cruise;
mod financials;
mod offer;
mod performance;
mod profile;

pub use cruise::{BulkOutcome, CruiseFilters, DateRange, RowError, SavingsSummary};
pub use calendar::EventFilters;
pub use offer::{ExpiredOfferPurge, OfferOverview, OfferStatus};

use crate::clock::Clock;
use crate::config::DeskConfig;
use crate::model::{
    BookedCruise, CalendarEvent, CasinoAnalytics, CasinoOffer, CasinoPerformance, Certificate, Cruise,
    FinancialsRecord, UserProfile,
};
use crate::persistence::{self, DocumentSink, FileSink, PersistStatus, PersistenceManager};
use crate::reconcile::{self, BookingFix};
use crate::snapshot::SnapshotRing;
use crate::types::Timestamp;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

/// Everything the store owns and persists.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    pub cruises:              Vec<Cruise>,
    pub booked_cruises:       Vec<BookedCruise>,
    pub casino_offers:        Vec<CasinoOffer>,
    pub calendar_events:      Vec<CalendarEvent>,
    pub financials:           Vec<FinancialsRecord>,
    pub casino_analytics:     Vec<CasinoAnalytics>,
    pub casino_performance:   Vec<CasinoPerformance>,
    pub certificates:         Vec<Certificate>,
    pub user_profile:         UserProfile,
    pub last_import:          Option<Timestamp>,
    pub web_pricing_snapshot: Option<serde_json::Value>,
}

impl StoreState {
    pub fn empty(now: Timestamp) -> Self {
        Self {
            cruises:              Vec::new(),
            booked_cruises:       Vec::new(),
            casino_offers:        Vec::new(),
            calendar_events:      Vec::new(),
            financials:           Vec::new(),
            casino_analytics:     Vec::new(),
            casino_performance:   Vec::new(),
            certificates:         Vec::new(),
            user_profile:         UserProfile::starting(now),
            last_import:          None,
            web_pricing_snapshot: None,
        }
    }

    pub fn counts(&self) -> CollectionCounts {
        CollectionCounts {
            cruises:            self.cruises.len(),
            booked_cruises:     self.booked_cruises.len(),
            casino_offers:      self.casino_offers.len(),
            calendar_events:    self.calendar_events.len(),
            financials:         self.financials.len(),
            casino_analytics:   self.casino_analytics.len(),
            casino_performance: self.casino_performance.len(),
            certificates:       self.certificates.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCounts {
    pub cruises:            usize,
    pub booked_cruises:     usize,
    pub casino_offers:      usize,
    pub calendar_events:    usize,
    pub financials:         usize,
    pub casino_analytics:   usize,
    pub casino_performance: usize,
    pub certificates:       usize,
}

/// Result of the startup load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A document was found and restored, then reconciled once.
    Restored(CollectionCounts),
    /// Nothing usable on disk. The caller owns sourcing initial data.
    NeedsInitialImport,
}

/// Counts of what one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub cruises_fixed:    usize,
    pub booked_fixed:     usize,
    pub offers_fixed:     usize,
    pub events_fixed:     usize,
    pub financials_fixed: usize,
    pub booking:          BookingFix,
    pub lifecycle:        usize,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.cruises_fixed
            + self.booked_fixed
            + self.offers_fixed
            + self.events_fixed
            + self.financials_fixed
            + self.booking.updated
            + self.booking.promoted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_cruises:     usize,
    pub booked_cruises:    usize,
    pub available_cruises: usize,
    pub casino_offers:     usize,
    pub calendar_events:   usize,
}

pub struct RecordStore {
    pub(crate) state:       StoreState,
    pub(crate) clock:       Clock,
    pub(crate) persistence: PersistenceManager,
    pub(crate) snapshots:   SnapshotRing,
    pub(crate) config:      DeskConfig,
}

impl RecordStore {
    pub fn new(config: DeskConfig, sink: Box<dyn DocumentSink>) -> Self {
        Self::with_clock(config, sink, Clock::System)
    }

    pub fn with_clock(config: DeskConfig, sink: Box<dyn DocumentSink>, clock: Clock) -> Self {
        let persistence = PersistenceManager::new(sink, config.persistence.debounce());
        let snapshots = SnapshotRing::new(config.snapshots.capacity);
        Self {
            state: StoreState::empty(clock.now()),
            clock,
            persistence,
            snapshots,
            config,
        }
    }

    /// Store backed by the configured document path.
    pub fn open(config: DeskConfig) -> Self {
        let sink = FileSink::new(config.persistence.path.clone());
        Self::new(config, Box::new(sink))
    }

    /// Restore the persisted document, if any, and reconcile it once.
    /// Debounced writes are suppressed for the duration. Read or parse
    /// failures are logged and reported as `NeedsInitialImport`.
    pub fn load(&mut self) -> LoadOutcome {
        self.persistence.begin_load();
        let outcome = self.load_inner();
        self.persistence.end_load();
        outcome
    }

    fn load_inner(&mut self) -> LoadOutcome {
        let text = match self.persistence.read() {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                log::info!("store: no persisted document, initial import required");
                return LoadOutcome::NeedsInitialImport;
            }
            Err(e) => {
                log::error!("store: cannot read persisted document: {e}");
                return LoadOutcome::NeedsInitialImport;
            }
        };

        let profile = self.state.user_profile.clone();
        match persistence::decode_document(&text, profile) {
            Ok(state) => {
                self.state = state;
                let report = self.reconcile_in_place();
                let counts = self.state.counts();
                log::info!(
                    "store: restored {} cruises, {} offers, {} events ({} reconciliation fixes)",
                    counts.cruises,
                    counts.casino_offers,
                    counts.calendar_events,
                    report.total()
                );
                LoadOutcome::Restored(counts)
            }
            Err(e) => {
                log::error!("store: persisted document unreadable, starting empty: {e}");
                LoadOutcome::NeedsInitialImport
            }
        }
    }

    // ── Clock ──────────────────────────────────────────────────────

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    /// Move a fixed clock forward (tests and simulations).
    pub fn advance_clock(&mut self, by: chrono::Duration) {
        self.clock.advance(by);
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    // ── Persistence ────────────────────────────────────────────────

    /// Schedule a debounced write after a mutation.
    pub(crate) fn touch(&mut self) {
        let now = self.clock.now();
        self.persistence.schedule(now);
    }

    /// Fire the pending write if its debounce deadline has passed.
    /// Returns true when a write succeeded.
    pub fn pump(&mut self) -> bool {
        if !self.persistence.is_due(self.clock.now()) {
            return false;
        }
        self.write_now()
    }

    /// Write immediately if anything is pending.
    pub fn flush(&mut self) -> bool {
        if !self.persistence.is_dirty() {
            return false;
        }
        self.write_now()
    }

    /// Write the current state unconditionally.
    pub fn write_now(&mut self) -> bool {
        let now = self.clock.now();
        match persistence::encode_document(&self.state, now) {
            Ok(doc) => self.persistence.write(&doc, now),
            Err(e) => {
                log::error!("persist: cannot encode document: {e}");
                false
            }
        }
    }

    pub fn persistence_status(&self) -> PersistStatus {
        self.persistence.status()
    }

    // ── Reconciliation ─────────────────────────────────────────────

    /// Recompute lifecycle status over both cruise collections.
    pub(crate) fn refresh_lifecycle(&mut self) -> usize {
        let today = self.clock.today();
        let now = self.clock.now();
        reconcile::apply_lifecycle(&mut self.state.cruises, &mut self.state.booked_cruises, today, now)
    }

    fn reconcile_in_place(&mut self) -> ReconcileReport {
        let today = self.clock.today();
        let now = self.clock.now();
        let mut report = ReconcileReport::default();

        for b in self.state.booked_cruises.iter_mut() {
            if reconcile::fix_booked(b, today) {
                b.updated_at = now;
                report.booked_fixed += 1;
            }
        }
        // Cruises are cleaned before legacy matching so stored text and
        // imported text compare in the same form.
        for c in self.state.cruises.iter_mut() {
            if reconcile::fix_cruise(c) {
                c.updated_at = now;
                report.cruises_fixed += 1;
            }
        }
        report.booking = reconcile::fix_booking_ids(&mut self.state.cruises, &self.state.booked_cruises, now);
        for o in self.state.casino_offers.iter_mut() {
            if reconcile::fix_offer(o) {
                o.updated_at = now;
                report.offers_fixed += 1;
            }
        }
        for e in self.state.calendar_events.iter_mut() {
            if reconcile::fix_event(e) {
                e.updated_at = now;
                report.events_fixed += 1;
            }
        }
        for r in self.state.financials.iter_mut() {
            if reconcile::classify_financial(r) {
                r.updated_at = now;
                report.financials_fixed += 1;
            }
        }
        report.lifecycle = self.refresh_lifecycle();
        report
    }

    /// Run every reconciliation pass. Safe to repeat; a pass over clean
    /// data reports zero fixes and schedules no write.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let report = self.reconcile_in_place();
        if report.total() > 0 || report.lifecycle > 0 {
            log::info!("store: reconciliation fixed {} records", report.total());
            self.touch();
        }
        report
    }

    /// Clean ship names on both cruise collections and calendar event
    /// titles. Returns the number of records changed.
    pub fn clean_ship_names(&mut self) -> usize {
        let now = self.clock.now();
        let mut cleaned = 0;
        let fields = self
            .state
            .cruises
            .iter_mut()
            .map(|c| (&mut c.ship, &mut c.updated_at))
            .chain(self.state.booked_cruises.iter_mut().map(|b| (&mut b.ship, &mut b.updated_at)))
            .chain(self.state.calendar_events.iter_mut().map(|e| (&mut e.summary, &mut e.updated_at)));
        for (text, updated_at) in fields {
            let clean = reconcile::clean_text(text);
            if clean != *text {
                *text = clean;
                *updated_at = now;
                cleaned += 1;
            }
        }
        if cleaned > 0 {
            log::info!("store: cleaned {cleaned} ship names and event titles");
            self.touch();
        }
        cleaned
    }

    /// Booking-id normalization on its own, as run after an import.
    pub fn fix_booking_ids(&mut self) -> BookingFix {
        let now = self.clock.now();
        let fix = reconcile::fix_booking_ids(&mut self.state.cruises, &self.state.booked_cruises, now);
        if fix.updated > 0 || fix.promoted > 0 {
            log::info!(
                "store: booking ids normalized ({} updated, {} promoted)",
                fix.updated, fix.promoted
            );
            self.refresh_lifecycle();
            self.touch();
        }
        fix
    }

    // ── Whole-store operations ─────────────────────────────────────

    /// Empty every collection except the user profile, then write the
    /// emptied document immediately.
    pub fn clear_all_data(&mut self) {
        let profile = self.state.user_profile.clone();
        let mut cleared = StoreState::empty(self.clock.now());
        cleared.user_profile = profile;
        self.state = cleared;
        log::info!("store: cleared all data (profile kept)");
        if !self.write_now() {
            // Keep the cleared state queued so a later write can land it.
            self.touch();
        }
    }

    pub fn stats(&self) -> StoreStats {
        let total = self.state.cruises.len();
        let booked = self.state.cruises.iter().filter(|c| c.is_booked()).count();
        StoreStats {
            total_cruises:     total,
            booked_cruises:    booked,
            available_cruises: total - booked,
            casino_offers:     self.state.casino_offers.len(),
            calendar_events:   self.state.calendar_events.len(),
        }
    }

    pub fn last_import(&self) -> Option<Timestamp> {
        self.state.last_import
    }

    pub(crate) fn mark_imported(&mut self) {
        self.state.last_import = Some(self.clock.now());
        self.touch();
    }

    pub fn web_pricing_snapshot(&self) -> Option<&serde_json::Value> {
        self.state.web_pricing_snapshot.as_ref()
    }

    /// Replace the opaque pricing cache blob.
    pub fn set_web_pricing_snapshot(&mut self, snapshot: serde_json::Value) {
        self.state.web_pricing_snapshot = Some(snapshot);
        self.touch();
    }

    // ── Analytics cache ────────────────────────────────────────────

    pub fn casino_analytics_for(&self, cruise_id: &str) -> Vec<CasinoAnalytics> {
        self.state
            .casino_analytics
            .iter()
            .filter(|a| a.cruise_id == cruise_id)
            .cloned()
            .collect()
    }

    pub fn all_casino_analytics(&self) -> &[CasinoAnalytics] {
        &self.state.casino_analytics
    }

    /// Store one calculation, replacing any earlier entry for the same
    /// cruise. Identity and `createdAt` of the replaced entry are kept.
    pub fn upsert_casino_analytics(&mut self, mut entry: CasinoAnalytics) -> CasinoAnalytics {
        let now = self.clock.now();
        entry.updated_at = now;
        match self
            .state
            .casino_analytics
            .iter_mut()
            .find(|a| a.cruise_id == entry.cruise_id)
        {
            Some(existing) => {
                entry.id = existing.id.clone();
                entry.created_at = existing.created_at;
                *existing = entry.clone();
            }
            None => {
                entry.id = uuid::Uuid::new_v4().to_string();
                entry.created_at = now;
                self.state.casino_analytics.push(entry.clone());
            }
        }
        self.touch();
        entry
    }
}

/// Departure ordering: parseable dates ascending, unparseable last.
pub(crate) fn by_departure(a: &str, b: &str) -> Ordering {
    match (reconcile::parse_date(a), reconcile::parse_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None)    => Ordering::Less,
        (None, Some(_))    => Ordering::Greater,
        (None, None)       => a.cmp(b),
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
