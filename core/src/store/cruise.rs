use super::{by_departure, new_id, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::model::{Cruise, LifecycleStatus};
use crate::reconcile;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive departure-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to:   NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Cruise query options. String filters are case-insensitive substrings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CruiseFilters {
    pub booked:     Option<bool>,
    pub line:       Option<String>,
    pub ship:       Option<String>,
    pub region:     Option<String>,
    pub date_range: Option<DateRange>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl CruiseFilters {
    pub fn matches(&self, c: &Cruise) -> bool {
        if let Some(booked) = self.booked {
            if c.is_booked() != booked {
                return false;
            }
        }
        if let Some(line) = self.line.as_deref() {
            if !contains_ci(&c.line, line) {
                return false;
            }
        }
        if let Some(ship) = self.ship.as_deref() {
            if !contains_ci(&c.ship, ship) {
                return false;
            }
        }
        if let Some(region) = self.region.as_deref() {
            if !c.region.as_deref().is_some_and(|r| contains_ci(r, region)) {
                return false;
            }
        }
        if let Some(range) = self.date_range {
            match reconcile::parse_date(&c.departure_date) {
                Some(dep) if range.contains(dep) => {}
                _ => return false,
            }
        }
        true
    }
}

/// One rejected row from a bulk create.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// Zero-based position in the submitted batch.
    pub index:   usize,
    pub message: String,
}

/// Bulk create result: rejected rows never abort the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome<T> {
    pub created: Vec<T>,
    pub errors:  Vec<RowError>,
}

impl<T> Default for BulkOutcome<T> {
    fn default() -> Self {
        Self { created: Vec::new(), errors: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsSummary {
    pub total_actual_savings:       f64,
    pub total_projected_savings:    f64,
    pub average_savings_per_cruise: f64,
    pub total_cruise_value:         f64,
    pub total_paid:                 f64,
}

/// Keep booking fields consistent with the reservation number.
fn link_booking(c: &mut Cruise) {
    if c.has_reservation() {
        c.booking_id = Some(c.id.clone());
    } else {
        c.booking_id = None;
        c.guests = None;
        c.days_to_go = None;
    }
}

impl RecordStore {
    /// Validate and insert without the lifecycle pass or a persist.
    fn insert_cruise(&mut self, mut draft: Cruise) -> StoreResult<Cruise> {
        if draft.departure_date.trim().is_empty() {
            return Err(StoreError::MissingField { entity: "cruise", field: "departureDate" });
        }
        let ship = reconcile::clean_text(&draft.ship);
        draft.ship = if ship.is_empty() { "Unknown Ship".to_string() } else { ship };
        if draft.stateroom_types.is_empty() {
            draft.stateroom_types = vec!["Interior".to_string()];
        }
        reconcile::repair_cruise_window(&mut draft);

        let now = self.clock.now();
        draft.id = new_id();
        draft.created_at = now;
        draft.updated_at = now;
        link_booking(&mut draft);

        log::debug!(
            "store: created cruise {} ({} {} +{}n)",
            draft.id, draft.ship, draft.departure_date, draft.nights
        );
        self.state.cruises.push(draft.clone());
        Ok(draft)
    }

    fn stored_cruise(&self, id: &str) -> Option<Cruise> {
        self.state.cruises.iter().find(|c| c.id == id).cloned()
    }

    /// Create a cruise. A missing ship becomes "Unknown Ship"; a missing
    /// departure date is a validation error.
    pub fn create_cruise(&mut self, draft: Cruise) -> StoreResult<Cruise> {
        let created = self.insert_cruise(draft)?;
        self.refresh_lifecycle();
        self.touch();
        Ok(self.stored_cruise(&created.id).unwrap_or(created))
    }

    /// Create many cruises, collecting per-row failures.
    pub fn bulk_create_cruises(&mut self, drafts: Vec<Cruise>) -> BulkOutcome<Cruise> {
        let total = drafts.len();
        let mut outcome = BulkOutcome::default();
        for (index, draft) in drafts.into_iter().enumerate() {
            let ship = if draft.ship.trim().is_empty() { "Unknown".to_string() } else { draft.ship.clone() };
            match self.insert_cruise(draft) {
                Ok(c) => outcome.created.push(c),
                Err(e) => {
                    log::warn!("store: cruise row {} rejected: {e}", index + 1);
                    outcome.errors.push(RowError {
                        index,
                        message: format!("Cruise {} ({ship}): {e}", index + 1),
                    });
                }
            }
        }
        if !outcome.created.is_empty() {
            self.refresh_lifecycle();
            self.touch();
        }
        log::info!(
            "store: bulk created {}/{} cruises ({} rejected)",
            outcome.created.len(), total, outcome.errors.len()
        );
        outcome
    }

    /// Apply `patch` to a cruise. Identity and `createdAt` cannot change;
    /// the return date follows any new departure date or nights.
    pub fn update_cruise(&mut self, id: &str, patch: impl FnOnce(&mut Cruise)) -> StoreResult<Cruise> {
        let now = self.clock.now();
        let cruise = self
            .state
            .cruises
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound { entity: "cruise", id: id.to_string() })?;

        let (keep_id, keep_created) = (cruise.id.clone(), cruise.created_at);
        patch(cruise);
        cruise.id = keep_id;
        cruise.created_at = keep_created;
        cruise.updated_at = now;
        reconcile::repair_cruise_window(cruise);
        link_booking(cruise);

        self.refresh_lifecycle();
        self.touch();
        self.stored_cruise(id)
            .ok_or_else(|| StoreError::NotFound { entity: "cruise", id: id.to_string() })
    }

    /// Hard delete. Returns false when no such cruise exists.
    pub fn delete_cruise(&mut self, id: &str) -> bool {
        let before = self.state.cruises.len();
        self.state.cruises.retain(|c| c.id != id);
        if self.state.cruises.len() == before {
            return false;
        }
        log::debug!("store: deleted cruise {id}");
        self.refresh_lifecycle();
        self.touch();
        true
    }

    /// Clones with lifecycle status computed for today.
    fn current_cruises(&self) -> impl Iterator<Item = Cruise> + '_ {
        let today = self.clock.today();
        self.state.cruises.iter().map(move |c| {
            let mut c = c.clone();
            if let Some(status) = reconcile::lifecycle_for(&c.departure_date, &c.return_date, today) {
                c.lifecycle_status = Some(status);
            }
            c
        })
    }

    pub fn get_cruise(&self, id: &str) -> Option<Cruise> {
        self.current_cruises().find(|c| c.id == id)
    }

    /// Filtered cruises, departure ascending.
    pub fn get_cruises(&self, filters: &CruiseFilters) -> Vec<Cruise> {
        let mut out: Vec<Cruise> = self.current_cruises().filter(|c| filters.matches(c)).collect();
        out.sort_by(|a, b| by_departure(&a.departure_date, &b.departure_date));
        out
    }

    /// Cruises without a booking.
    pub fn get_available_cruises(&self, filters: &CruiseFilters) -> Vec<Cruise> {
        let filters = CruiseFilters { booked: Some(false), ..filters.clone() };
        self.get_cruises(&filters)
    }

    fn has_booking_evidence(&self, c: &Cruise) -> bool {
        c.has_reservation()
            || c.is_booked()
            || self.state.financials.iter().any(|f| f.cruise_id == c.id)
    }

    /// Cruises with any reservation, booking or receipt/statement evidence,
    /// departure ascending.
    pub fn get_booked_cruises(&self) -> Vec<Cruise> {
        let mut out: Vec<Cruise> = self
            .current_cruises()
            .filter(|c| self.has_booking_evidence(c))
            .collect();
        out.sort_by(|a, b| by_departure(&a.departure_date, &b.departure_date));
        out
    }

    /// Booked cruises that departed before today, most recent first.
    pub fn get_completed_cruises(&self) -> Vec<Cruise> {
        let today = self.clock.today();
        let mut out: Vec<Cruise> = self
            .get_booked_cruises()
            .into_iter()
            .filter(|c| reconcile::parse_date(&c.departure_date).is_some_and(|d| d < today))
            .collect();
        out.sort_by(|a, b| by_departure(&b.departure_date, &a.departure_date));
        out
    }

    /// Cruises in the given lifecycle status, departure ascending.
    pub fn cruises_with_status(&self, status: LifecycleStatus) -> Vec<Cruise> {
        self.get_cruises(&CruiseFilters::default())
            .into_iter()
            .filter(|c| c.lifecycle_status == Some(status))
            .collect()
    }

    pub fn savings_summary(&self) -> SavingsSummary {
        let booked = self.get_booked_cruises();
        let total_actual_savings: f64 = booked.iter().filter_map(|c| c.actual_savings).sum();
        let total_projected_savings: f64 = booked.iter().filter_map(|c| c.projected_savings).sum();
        let total_cruise_value: f64 = booked
            .iter()
            .map(|c| c.current_market_price.or(c.actual_fare).unwrap_or(0.0))
            .sum();
        let total_paid: f64 = booked.iter().filter_map(|c| c.paid_fare).sum();
        let average_savings_per_cruise = if booked.is_empty() {
            0.0
        } else {
            total_actual_savings / booked.len() as f64
        };
        SavingsSummary {
            total_actual_savings,
            total_projected_savings,
            average_savings_per_cruise,
            total_cruise_value,
            total_paid,
        }
    }
}
