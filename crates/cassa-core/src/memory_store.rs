//! In-process [`ObligationStore`] used by tests, benches and the demo dataset.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    thread,
    time::Duration,
};

use chrono::NaiveDate;
use uuid::Uuid;

use cassa_domain::{BankAccount, Counterparty, Obligation, ObligationStatus};

use crate::storage::{
    apply_payment_to, apply_status_to, Deadline, ObligationStore, PaymentRecord, StoreError,
    StoreResult,
};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: Vec<BankAccount>,
    counterparties: Vec<Counterparty>,
    obligations: Vec<Obligation>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
    read_latency: Option<Duration>,
    offline: AtomicBool,
    reject_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps before every bulk read, for exercising deadlines.
    pub fn with_read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = Some(latency);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn add_account(&self, account: BankAccount) -> StoreResult<()> {
        self.write()?.accounts.push(account);
        Ok(())
    }

    pub fn add_counterparty(&self, counterparty: Counterparty) -> StoreResult<()> {
        self.write()?.counterparties.push(counterparty);
        Ok(())
    }

    /// All obligations, settled ones included.
    pub fn obligations(&self) -> StoreResult<Vec<Obligation>> {
        Ok(self.read()?.obligations.clone())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.ensure_online()?;
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.ensure_online()?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("store is read-only".into()));
        }
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn bulk_read(&self, deadline: Deadline) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        if let Some(latency) = self.read_latency {
            thread::sleep(latency);
        }
        deadline.check()?;
        self.read()
    }

    fn with_obligation<T>(
        &self,
        id: Uuid,
        update: impl FnOnce(&mut Obligation) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self.write()?;
        let obligation = state
            .obligations
            .iter_mut()
            .find(|obligation| obligation.id == id)
            .ok_or(StoreError::NotFound(id))?;
        update(obligation)
    }
}

impl ObligationStore for InMemoryStore {
    fn list_active_accounts(&self, deadline: Deadline) -> StoreResult<Vec<BankAccount>> {
        let state = self.bulk_read(deadline)?;
        Ok(state
            .accounts
            .iter()
            .filter(|account| account.is_active)
            .cloned()
            .collect())
    }

    fn list_open_obligations(&self, deadline: Deadline) -> StoreResult<Vec<Obligation>> {
        let state = self.bulk_read(deadline)?;
        Ok(state
            .obligations
            .iter()
            .filter(|obligation| !obligation.is_settled())
            .cloned()
            .collect())
    }

    fn list_counterparties(&self, deadline: Deadline) -> StoreResult<Vec<Counterparty>> {
        Ok(self.bulk_read(deadline)?.counterparties.clone())
    }

    fn get_obligation(&self, id: Uuid) -> StoreResult<Obligation> {
        self.read()?
            .obligations
            .iter()
            .find(|obligation| obligation.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn insert_obligation(&self, obligation: &Obligation) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.obligations.iter().any(|existing| existing.id == obligation.id) {
            return Err(StoreError::Write(format!(
                "obligation {} already exists",
                obligation.id
            )));
        }
        state.obligations.push(obligation.clone());
        Ok(())
    }

    fn update_obligation_planned_date(
        &self,
        id: Uuid,
        date: Option<NaiveDate>,
    ) -> StoreResult<()> {
        self.with_obligation(id, |obligation| {
            obligation.planned_settlement_date = date;
            Ok(())
        })
    }

    fn update_obligation_site(&self, id: Uuid, site_id: Option<Uuid>) -> StoreResult<()> {
        self.with_obligation(id, |obligation| {
            obligation.site_id = site_id;
            Ok(())
        })
    }

    fn update_obligation_status(
        &self,
        id: Uuid,
        expected_version: u64,
        status: ObligationStatus,
    ) -> StoreResult<()> {
        self.with_obligation(id, |obligation| {
            apply_status_to(obligation, expected_version, status)
        })
    }

    fn apply_payment(&self, payment: &PaymentRecord) -> StoreResult<Obligation> {
        self.with_obligation(payment.obligation_id, |obligation| {
            apply_payment_to(obligation, payment)?;
            Ok(obligation.clone())
        })
    }
}
