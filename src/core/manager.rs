use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    billing,
    capacity::CapacityLedger,
    config::Config,
    domain::{Guest, GuestPatch},
    errors::Result,
    storage::StorageBackend,
};

use super::time::Clock;

/// Outcome of a full reload.
#[derive(Debug, Clone, Default)]
pub struct ReloadReport {
    pub guests: usize,
    pub cells: usize,
    pub breached: Vec<Uuid>,
}

/// Owns the guest list and capacity ledger snapshots.
///
/// Snapshots are only ever replaced wholesale after every fetch succeeded, or
/// patched after the store accepted a write. A failed fetch or write leaves
/// them as they were.
pub struct PropertyManager {
    storage: Box<dyn StorageBackend>,
    config: Config,
    clock: Arc<dyn Clock>,
    guests: Vec<Guest>,
    ledger: CapacityLedger,
}

impl PropertyManager {
    pub fn new(storage: Box<dyn StorageBackend>, config: Config, clock: Arc<dyn Clock>) -> Self {
        let ledger = CapacityLedger::new(config.default_capacity_map(), &[]);
        Self {
            storage,
            config,
            clock,
            guests: Vec::new(),
            ledger,
        }
    }

    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn guests(&self) -> &[Guest] {
        &self.guests
    }

    pub fn guest(&self, id: Uuid) -> Option<&Guest> {
        self.guests.iter().find(|guest| guest.id == id)
    }

    pub fn ledger(&self) -> &CapacityLedger {
        &self.ledger
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Reads guests and capacity overrides without touching the cache.
    pub fn fetch_snapshot(&self) -> Result<(Vec<Guest>, CapacityLedger)> {
        let guests = self.storage.list()?;
        let rows = self.storage.list_all()?;
        let ledger = CapacityLedger::new(self.config.default_capacity_map(), &rows);
        Ok((guests, ledger))
    }

    pub fn reload(&mut self) -> Result<ReloadReport> {
        let (guests, ledger) = self.fetch_snapshot()?;
        Ok(self.install(guests, ledger))
    }

    /// Replaces both snapshots, applying due breaches first.
    pub(crate) fn install(&mut self, mut guests: Vec<Guest>, ledger: CapacityLedger) -> ReloadReport {
        let breached = self.apply_breaches(&mut guests);
        let report = ReloadReport {
            guests: guests.len(),
            cells: ledger.map().len(),
            breached,
        };
        self.guests = guests;
        self.ledger = ledger;
        tracing::debug!(
            guests = report.guests,
            breached = report.breached.len(),
            "snapshot installed"
        );
        report
    }

    /// Re-runs the breach rule over the cached guests.
    pub fn refresh_breaches(&mut self) -> Vec<Uuid> {
        let mut guests = std::mem::take(&mut self.guests);
        let breached = self.apply_breaches(&mut guests);
        self.guests = guests;
        breached
    }

    fn apply_breaches(&self, guests: &mut [Guest]) -> Vec<Uuid> {
        let today = self.today();
        let mut breached = Vec::new();
        for guest in guests.iter_mut() {
            let Some(status) = billing::breach_transition(
                guest.monthly_payment_status,
                guest.upcoming_payment_due_date,
                today,
            ) else {
                continue;
            };
            match self.storage.update(guest.id, &GuestPatch::status(status)) {
                Ok(updated) => {
                    tracing::info!(guest = %guest.id, name = %guest.name, "payment breached");
                    *guest = updated;
                    breached.push(guest.id);
                }
                Err(err) => {
                    tracing::warn!(guest = %guest.id, error = %err, "failed to persist breach");
                }
            }
        }
        breached
    }

    pub(crate) fn upsert_cached(&mut self, guest: Guest) {
        match self.guests.iter_mut().find(|existing| existing.id == guest.id) {
            Some(existing) => *existing = guest,
            None => self.guests.push(guest),
        }
    }

    pub(crate) fn remove_cached(&mut self, id: Uuid) {
        self.guests.retain(|guest| guest.id != id);
    }
}
