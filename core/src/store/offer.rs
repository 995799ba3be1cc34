//! Casino offers. Offers are created on import and kept after expiry for
//! historical analysis; only an explicit delete removes one.

use super::{new_id, BulkOutcome, RecordStore};
use crate::model::CasinoOffer;
use crate::reconcile;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Days before expiry at which an offer counts as expiring soon.
const EXPIRING_SOON_DAYS: i64 = 7;
/// Window for counting upcoming linked sailings.
const UPCOMING_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OfferStatus {
    Active,
    ExpiringSoon,
    Expired,
}

/// Per-offer linkage summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferOverview {
    pub offer:            CasinoOffer,
    pub linked_cruises:   usize,
    pub upcoming_cruises: usize,
    pub status:           OfferStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiredOfferPurge {
    pub deleted_offers:  usize,
    pub deleted_cruises: usize,
}

fn norm(text: Option<&str>) -> String {
    text.unwrap_or_default().trim().to_lowercase()
}

fn by_expiry(a: &CasinoOffer, b: &CasinoOffer) -> Ordering {
    super::by_departure(&a.expires, &b.expires)
}

impl RecordStore {
    fn insert_offer(&mut self, mut draft: CasinoOffer) -> CasinoOffer {
        let now = self.clock.now();
        draft.id = new_id();
        draft.created_at = now;
        draft.updated_at = now;
        self.state.casino_offers.push(draft.clone());
        draft
    }

    pub fn create_casino_offer(&mut self, draft: CasinoOffer) -> CasinoOffer {
        let created = self.insert_offer(draft);
        log::debug!("store: created offer {} ({})", created.id, created.offer_code);
        self.touch();
        created
    }

    pub fn bulk_create_casino_offers(&mut self, drafts: Vec<CasinoOffer>) -> BulkOutcome<CasinoOffer> {
        let mut outcome = BulkOutcome::default();
        for draft in drafts {
            let created = self.insert_offer(draft);
            outcome.created.push(created);
        }
        if !outcome.created.is_empty() {
            self.touch();
        }
        log::info!("store: bulk created {} casino offers", outcome.created.len());
        outcome
    }

    /// All offers, soonest expiry first.
    pub fn get_casino_offers(&self) -> Vec<CasinoOffer> {
        let mut out = self.state.casino_offers.clone();
        out.sort_by(by_expiry);
        out
    }

    pub fn get_casino_offer(&self, id: &str) -> Option<CasinoOffer> {
        self.state.casino_offers.iter().find(|o| o.id == id).cloned()
    }

    /// Explicit hard delete of one offer.
    pub fn delete_casino_offer(&mut self, id: &str) -> bool {
        let before = self.state.casino_offers.len();
        self.state.casino_offers.retain(|o| o.id != id);
        if self.state.casino_offers.len() == before {
            return false;
        }
        self.touch();
        true
    }

    /// Expired offers are retained for history; this never deletes.
    pub fn delete_expired_offers(&mut self) -> ExpiredOfferPurge {
        log::info!("store: expired offers are retained, nothing deleted");
        ExpiredOfferPurge::default()
    }

    pub fn offer_status(&self, offer: &CasinoOffer) -> OfferStatus {
        let today = self.clock.today();
        match reconcile::parse_date(&offer.expires) {
            Some(exp) if exp < today => OfferStatus::Expired,
            Some(exp) if (exp - today).num_days() <= EXPIRING_SOON_DAYS => OfferStatus::ExpiringSoon,
            _ => OfferStatus::Active,
        }
    }

    /// Cruises per offer key: `CODE_EXPIRY` when the cruise carries an
    /// offer expiration date, the bare offer code otherwise.
    pub fn linked_cruise_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.state.cruises {
            let Some(code) = c.offer_code.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            let key = match c.offer_expiration_date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                Some(exp) => format!("{code}_{exp}"),
                None => code.to_string(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }

    /// Cruises linked to each offer by code or name, with upcoming counts
    /// and expiry status. Latest expiry first, then most linked.
    pub fn offer_overview(&self) -> Vec<OfferOverview> {
        let today = self.clock.today();
        let mut out: Vec<OfferOverview> = self
            .state
            .casino_offers
            .iter()
            .map(|offer| {
                let code = norm(Some(offer.offer_code.as_str()));
                let name = norm(Some(offer.offer_name.as_str()));
                let linked: Vec<_> = self
                    .state
                    .cruises
                    .iter()
                    .filter(|c| {
                        let c_code = norm(c.offer_code.as_deref());
                        let c_name = norm(c.offer_name.as_deref());
                        (!code.is_empty() && c_code == code) || (!name.is_empty() && c_name == name)
                    })
                    .collect();
                let upcoming = linked
                    .iter()
                    .filter(|c| {
                        reconcile::parse_date(&c.departure_date).is_some_and(|d| {
                            let ahead = (d - today).num_days();
                            (0..=UPCOMING_WINDOW_DAYS).contains(&ahead)
                        })
                    })
                    .count();
                OfferOverview {
                    offer:            offer.clone(),
                    linked_cruises:   linked.len(),
                    upcoming_cruises: upcoming,
                    status:           self.offer_status(offer),
                }
            })
            .collect();
        out.sort_by(|a, b| {
            by_expiry(&b.offer, &a.offer).then(b.linked_cruises.cmp(&a.linked_cruises))
        });
        out
    }
}
