use super::{by_departure, new_id, BulkOutcome, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::model::BookedCruise;
use crate::reconcile;

impl RecordStore {
    fn insert_booked(&mut self, mut draft: BookedCruise) -> BookedCruise {
        let now = self.clock.now();
        draft.ship = reconcile::clean_text(&draft.ship);
        reconcile::repair_booked_window(&mut draft);
        draft.id = new_id();
        draft.created_at = now;
        draft.updated_at = now;
        if let Some(days) = reconcile::days_to_go(&draft.departure_date, self.clock.today()) {
            draft.days_to_go = days;
        }
        self.state.booked_cruises.push(draft.clone());
        draft
    }

    pub fn create_booked_cruise(&mut self, draft: BookedCruise) -> BookedCruise {
        let created = self.insert_booked(draft);
        log::debug!("store: created legacy booking {} ({})", created.id, created.reservation_number);
        self.refresh_lifecycle();
        self.touch();
        self.get_booked_cruise(&created.id).unwrap_or(created)
    }

    pub fn bulk_create_booked_cruises(&mut self, drafts: Vec<BookedCruise>) -> BulkOutcome<BookedCruise> {
        let mut outcome = BulkOutcome::default();
        for draft in drafts {
            let created = self.insert_booked(draft);
            outcome.created.push(created);
        }
        if !outcome.created.is_empty() {
            self.refresh_lifecycle();
            self.touch();
        }
        log::info!("store: bulk created {} legacy bookings", outcome.created.len());
        outcome
    }

    /// Clones with days-to-go and lifecycle status computed for today.
    fn current_booked(&self) -> impl Iterator<Item = BookedCruise> + '_ {
        let today = self.clock.today();
        self.state.booked_cruises.iter().map(move |b| {
            let mut b = b.clone();
            if let Some(days) = reconcile::days_to_go(&b.departure_date, today) {
                b.days_to_go = days;
            }
            if let Some(status) = reconcile::lifecycle_for(&b.departure_date, &b.return_date, today) {
                b.lifecycle_status = Some(status);
            }
            b
        })
    }

    pub fn get_booked_cruise(&self, id: &str) -> Option<BookedCruise> {
        self.current_booked().find(|b| b.id == id)
    }

    /// All legacy booking records, departure ascending.
    pub fn get_legacy_booked_cruises(&self) -> Vec<BookedCruise> {
        let mut out: Vec<BookedCruise> = self.current_booked().collect();
        out.sort_by(|a, b| by_departure(&a.departure_date, &b.departure_date));
        out
    }

    pub fn update_booked_cruise(
        &mut self,
        id:    &str,
        patch: impl FnOnce(&mut BookedCruise),
    ) -> StoreResult<BookedCruise> {
        let now = self.clock.now();
        let booked = self
            .state
            .booked_cruises
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::NotFound { entity: "booked cruise", id: id.to_string() })?;

        let (keep_id, keep_created) = (booked.id.clone(), booked.created_at);
        patch(booked);
        booked.id = keep_id;
        booked.created_at = keep_created;
        booked.updated_at = now;
        reconcile::repair_booked_window(booked);

        self.refresh_lifecycle();
        self.touch();
        self.get_booked_cruise(id)
            .ok_or_else(|| StoreError::NotFound { entity: "booked cruise", id: id.to_string() })
    }

    pub fn delete_booked_cruise(&mut self, id: &str) -> bool {
        let before = self.state.booked_cruises.len();
        self.state.booked_cruises.retain(|b| b.id != id);
        if self.state.booked_cruises.len() == before {
            return false;
        }
        self.refresh_lifecycle();
        self.touch();
        true
    }
}
