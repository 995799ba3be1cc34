use super::{new_id, BulkOutcome, DateRange, RecordStore, RowError};
use crate::error::{StoreError, StoreResult};
use crate::model::{CalendarEvent, EventSource};
use crate::reconcile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventFilters {
    pub source:     Option<EventSource>,
    /// Events fully inside the window: start ≥ from and end ≤ to.
    pub date_range: Option<DateRange>,
}

impl EventFilters {
    fn matches(&self, e: &CalendarEvent) -> bool {
        if let Some(source) = self.source {
            if e.source != source {
                return false;
            }
        }
        if let Some(range) = self.date_range {
            let start = reconcile::parse_date(&e.start_date);
            let end = reconcile::parse_date(&e.end_date).or(start);
            match (start, end) {
                (Some(s), Some(t)) if s >= range.from && t <= range.to => {}
                _ => return false,
            }
        }
        true
    }
}

impl RecordStore {
    fn insert_event(&mut self, mut draft: CalendarEvent) -> StoreResult<CalendarEvent> {
        if draft.start_date.trim().is_empty() {
            return Err(StoreError::MissingField { entity: "calendar event", field: "startDate" });
        }
        let now = self.clock.now();
        draft.summary = reconcile::clean_text(&draft.summary);
        if draft.end_date.trim().is_empty() {
            draft.end_date = draft.start_date.clone();
        }
        draft.id = new_id();
        draft.created_at = now;
        draft.updated_at = now;
        self.state.calendar_events.push(draft.clone());
        Ok(draft)
    }

    pub fn create_calendar_event(&mut self, draft: CalendarEvent) -> StoreResult<CalendarEvent> {
        let created = self.insert_event(draft)?;
        log::debug!("store: created {:?} event {} ({})", created.source, created.id, created.summary);
        self.touch();
        Ok(created)
    }

    pub fn bulk_create_calendar_events(&mut self, drafts: Vec<CalendarEvent>) -> BulkOutcome<CalendarEvent> {
        let mut outcome = BulkOutcome::default();
        for (index, draft) in drafts.into_iter().enumerate() {
            match self.insert_event(draft) {
                Ok(e) => outcome.created.push(e),
                Err(e) => outcome.errors.push(RowError {
                    index,
                    message: format!("Event {}: {e}", index + 1),
                }),
            }
        }
        if !outcome.created.is_empty() {
            self.touch();
        }
        log::info!(
            "store: bulk created {} calendar events ({} rejected)",
            outcome.created.len(), outcome.errors.len()
        );
        outcome
    }

    /// Filtered events, start date ascending.
    pub fn get_calendar_events(&self, filters: &EventFilters) -> Vec<CalendarEvent> {
        let mut out: Vec<CalendarEvent> = self
            .state
            .calendar_events
            .iter()
            .filter(|e| filters.matches(e))
            .cloned()
            .collect();
        out.sort_by(|a, b| super::by_departure(&a.start_date, &b.start_date));
        out
    }

    pub fn get_calendar_event(&self, id: &str) -> Option<CalendarEvent> {
        self.state.calendar_events.iter().find(|e| e.id == id).cloned()
    }

    pub fn update_calendar_event(
        &mut self,
        id:    &str,
        patch: impl FnOnce(&mut CalendarEvent),
    ) -> StoreResult<CalendarEvent> {
        let now = self.clock.now();
        let event = self
            .state
            .calendar_events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound { entity: "calendar event", id: id.to_string() })?;
        let (keep_id, keep_created) = (event.id.clone(), event.created_at);
        patch(event);
        event.id = keep_id;
        event.created_at = keep_created;
        event.updated_at = now;
        let updated = event.clone();
        self.touch();
        Ok(updated)
    }

    pub fn delete_calendar_event(&mut self, id: &str) -> bool {
        let before = self.state.calendar_events.len();
        self.state.calendar_events.retain(|e| e.id != id);
        if self.state.calendar_events.len() == before {
            return false;
        }
        self.touch();
        true
    }
}
