//! Cruise certificates and future cruise credits.

use super::{by_departure, new_id, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::model::Certificate;
use crate::reconcile;

impl RecordStore {
    /// All certificates, soonest expiry first.
    pub fn get_certificates(&self) -> Vec<Certificate> {
        let mut out = self.state.certificates.clone();
        out.sort_by(|a, b| by_departure(&a.expires_on, &b.expires_on));
        out
    }

    pub fn get_certificate(&self, id: &str) -> Option<Certificate> {
        self.state.certificates.iter().find(|c| c.id == id).cloned()
    }

    /// Unused certificates that have not expired yet, soonest expiry first.
    pub fn usable_certificates(&self) -> Vec<Certificate> {
        let today = self.clock.today();
        self.get_certificates()
            .into_iter()
            .filter(|c| !c.is_used)
            .filter(|c| reconcile::parse_date(&c.expires_on).map_or(true, |exp| exp >= today))
            .collect()
    }

    pub fn create_certificate(&mut self, mut draft: Certificate) -> Certificate {
        let now = self.clock.now();
        for date in [&mut draft.earned_date, &mut draft.expires_on] {
            if let Some(iso) = reconcile::standardize_date(date) {
                *date = iso;
            }
        }
        draft.id = new_id();
        draft.created_at = now;
        draft.updated_at = now;
        self.state.certificates.push(draft.clone());
        log::debug!("store: created {:?} certificate {} ({})", draft.kind, draft.id, draft.value);
        self.touch();
        draft
    }

    pub fn update_certificate(
        &mut self,
        id:    &str,
        patch: impl FnOnce(&mut Certificate),
    ) -> StoreResult<Certificate> {
        let now = self.clock.now();
        let cert = self
            .state
            .certificates
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound { entity: "certificate", id: id.to_string() })?;
        let (keep_id, keep_created) = (cert.id.clone(), cert.created_at);
        patch(cert);
        cert.id = keep_id;
        cert.created_at = keep_created;
        cert.updated_at = now;
        let updated = cert.clone();
        self.touch();
        Ok(updated)
    }

    pub fn delete_certificate(&mut self, id: &str) -> bool {
        let before = self.state.certificates.len();
        self.state.certificates.retain(|c| c.id != id);
        if self.state.certificates.len() == before {
            return false;
        }
        self.touch();
        true
    }
}
