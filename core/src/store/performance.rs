//! Casino performance, one self-reported record per cruise.

use super::{new_id, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::model::CasinoPerformance;

impl RecordStore {
    /// All records, most recently updated first.
    pub fn list_casino_performance(&self) -> Vec<CasinoPerformance> {
        let mut out = self.state.casino_performance.clone();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        out
    }

    pub fn casino_performance_for(&self, cruise_id: &str) -> Option<CasinoPerformance> {
        self.state
            .casino_performance
            .iter()
            .find(|p| p.cruise_id == cruise_id)
            .cloned()
    }

    /// Insert or replace. A record is matched by its id when the draft
    /// carries one, otherwise by cruise id. A replaced record keeps its
    /// identity and `createdAt`.
    pub fn upsert_casino_performance(&mut self, mut draft: CasinoPerformance) -> StoreResult<CasinoPerformance> {
        if draft.cruise_id.trim().is_empty() {
            return Err(StoreError::MissingField { entity: "casino performance", field: "cruiseId" });
        }
        let now = self.clock.now();
        draft.updated_at = now;

        let existing = if draft.id.is_empty() {
            self.state.casino_performance.iter_mut().find(|p| p.cruise_id == draft.cruise_id)
        } else {
            self.state.casino_performance.iter_mut().find(|p| p.id == draft.id)
        };
        match existing {
            Some(record) => {
                draft.id = record.id.clone();
                draft.created_at = record.created_at;
                *record = draft.clone();
                log::debug!("store: updated casino performance {} for cruise {}", draft.id, draft.cruise_id);
            }
            None => {
                draft.id = new_id();
                draft.created_at = now;
                self.state.casino_performance.push(draft.clone());
                log::debug!("store: recorded casino performance {} for cruise {}", draft.id, draft.cruise_id);
            }
        }
        self.touch();
        Ok(draft)
    }

    pub fn delete_casino_performance(&mut self, id: &str) -> bool {
        let before = self.state.casino_performance.len();
        self.state.casino_performance.retain(|p| p.id != id);
        if self.state.casino_performance.len() == before {
            return false;
        }
        self.touch();
        true
    }
}
