use super::{new_id, BulkOutcome, RecordStore, RowError};
use crate::error::{StoreError, StoreResult};
use crate::model::FinancialsRecord;
use crate::reconcile;
use std::collections::BTreeMap;

impl RecordStore {
    /// Append receipt/statement lines. Each line is classified from its
    /// description on the way in; lines without a cruise id are rejected.
    pub fn add_financials(&mut self, records: Vec<FinancialsRecord>) -> BulkOutcome<FinancialsRecord> {
        let now = self.clock.now();
        let mut outcome = BulkOutcome::default();
        for (index, mut record) in records.into_iter().enumerate() {
            if record.cruise_id.trim().is_empty() {
                let e = StoreError::MissingField { entity: "financials record", field: "cruiseId" };
                outcome.errors.push(RowError { index, message: format!("Line {}: {e}", index + 1) });
                continue;
            }
            reconcile::classify_financial(&mut record);
            record.id = new_id();
            record.created_at = now;
            record.updated_at = now;
            self.state.financials.push(record.clone());
            outcome.created.push(record);
        }
        if !outcome.created.is_empty() {
            self.touch();
        }
        log::info!(
            "store: added {} financial lines ({} rejected)",
            outcome.created.len(), outcome.errors.len()
        );
        outcome
    }

    /// All lines, newest first.
    pub fn get_financials(&self) -> Vec<FinancialsRecord> {
        let mut out = self.state.financials.clone();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn get_financials_by_cruise(&self, cruise_id: &str) -> Vec<FinancialsRecord> {
        self.state
            .financials
            .iter()
            .filter(|f| f.cruise_id == cruise_id)
            .cloned()
            .collect()
    }

    pub fn get_financial(&self, id: &str) -> Option<FinancialsRecord> {
        self.state.financials.iter().find(|f| f.id == id).cloned()
    }

    /// Apply `patch` to one line and classify it again. Derived fields the
    /// patch left alone are recomputed when the line's text changed; values
    /// the patch set explicitly are kept.
    pub fn update_financial(
        &mut self,
        id:    &str,
        patch: impl FnOnce(&mut FinancialsRecord),
    ) -> StoreResult<FinancialsRecord> {
        let now = self.clock.now();
        let record = self
            .state
            .financials
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound { entity: "financials record", id: id.to_string() })?;

        let before = record.clone();
        let mut patched = record.clone();
        patch(&mut patched);
        if patched.cruise_id.trim().is_empty() {
            return Err(StoreError::MissingField { entity: "financials record", field: "cruiseId" });
        }
        patched.id = before.id.clone();
        patched.created_at = before.created_at;
        patched.updated_at = now;
        if patched.item_description != before.item_description || patched.description != before.description {
            reset_derived(&mut patched, &before);
        }
        reconcile::classify_financial(&mut patched);
        *record = patched.clone();

        self.touch();
        Ok(patched)
    }

    pub fn delete_financial(&mut self, id: &str) -> bool {
        let before = self.state.financials.len();
        self.state.financials.retain(|f| f.id != id);
        if self.state.financials.len() == before {
            return false;
        }
        self.touch();
        true
    }

    /// Casino-department spend per cruise id (absolute amounts).
    pub fn casino_spend_by_cruise(&self) -> BTreeMap<String, f64> {
        let mut spend = BTreeMap::new();
        for f in self.state.financials.iter().filter(|f| f.is_casino()) {
            *spend.entry(f.cruise_id.clone()).or_insert(0.0) += f.charged().abs();
        }
        spend
    }
}

/// Clear classification output that still equals the pre-patch value.
fn reset_derived(r: &mut FinancialsRecord, before: &FinancialsRecord) {
    if r.category == before.category {
        r.category = None;
    }
    if r.department == before.department {
        r.department = None;
    }
    if r.sub_category == before.sub_category {
        r.sub_category = None;
    }
    if r.onboard_credit_applied == before.onboard_credit_applied {
        r.onboard_credit_applied = None;
    }
    if r.ref_number == before.ref_number {
        r.ref_number = None;
    }
    if r.folio_number == before.folio_number {
        r.folio_number = None;
    }
}
