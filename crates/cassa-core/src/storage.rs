use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use cassa_domain::{BankAccount, Counterparty, Obligation, ObligationStatus, PaymentMethod};

/// Failures reported by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),
    #[error("deadline exceeded")]
    Timeout,
    #[error("obligation {0} does not exist")]
    NotFound(Uuid),
    #[error("obligation {id} is at version {found}, expected {expected}")]
    VersionMismatch { id: Uuid, expected: u64, found: u64 },
    #[error("{0}")]
    Write(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Upper bound on how long a bulk read may take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    pub fn from_millis(timeout_ms: Option<u64>) -> Self {
        timeout_ms
            .map(|ms| Self::after(Duration::from_millis(ms)))
            .unwrap_or_default()
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn check(&self) -> StoreResult<()> {
        if self.is_expired() {
            Err(StoreError::Timeout)
        } else {
            Ok(())
        }
    }
}

/// A payment to be applied atomically against an obligation row.
///
/// The store accepts it only when the stored version still equals
/// `expected_version`, so two concurrent payments cannot both read the same
/// paid amount and overwrite each other.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub obligation_id: Uuid,
    pub expected_version: u64,
    pub amount: Decimal,
    pub settlement_date: NaiveDate,
    pub method: PaymentMethod,
    pub resulting_status: ObligationStatus,
}

/// Abstraction over the persistent store that owns obligations, accounts and counterparties.
///
/// Planned-date and site updates do not touch `Obligation::version`; payments and
/// status writes bump it by one.
pub trait ObligationStore: Send + Sync {
    fn list_active_accounts(&self, deadline: Deadline) -> StoreResult<Vec<BankAccount>>;
    /// Every obligation whose stored status is not `Settled`.
    fn list_open_obligations(&self, deadline: Deadline) -> StoreResult<Vec<Obligation>>;
    fn list_counterparties(&self, deadline: Deadline) -> StoreResult<Vec<Counterparty>>;
    fn get_obligation(&self, id: Uuid) -> StoreResult<Obligation>;
    fn insert_obligation(&self, obligation: &Obligation) -> StoreResult<()>;
    fn update_obligation_planned_date(&self, id: Uuid, date: Option<NaiveDate>)
        -> StoreResult<()>;
    fn update_obligation_site(&self, id: Uuid, site_id: Option<Uuid>) -> StoreResult<()>;
    fn update_obligation_status(
        &self,
        id: Uuid,
        expected_version: u64,
        status: ObligationStatus,
    ) -> StoreResult<()>;
    /// Adds `payment.amount` to the paid amount and stores the resulting status,
    /// returning the updated row.
    fn apply_payment(&self, payment: &PaymentRecord) -> StoreResult<Obligation>;
}

/// Applies a payment to an in-memory row after the version check succeeded.
pub fn apply_payment_to(obligation: &mut Obligation, payment: &PaymentRecord) -> StoreResult<()> {
    if obligation.version != payment.expected_version {
        return Err(StoreError::VersionMismatch {
            id: obligation.id,
            expected: payment.expected_version,
            found: obligation.version,
        });
    }
    obligation.paid_amount += payment.amount;
    obligation.status = payment.resulting_status;
    obligation.payment_method = Some(payment.method.clone());
    if payment.resulting_status.is_settled() {
        obligation.settlement_date = Some(payment.settlement_date);
    }
    obligation.version += 1;
    Ok(())
}

/// Applies a status write to an in-memory row after checking its version.
pub fn apply_status_to(
    obligation: &mut Obligation,
    expected_version: u64,
    status: ObligationStatus,
) -> StoreResult<()> {
    if obligation.version != expected_version {
        return Err(StoreError::VersionMismatch {
            id: obligation.id,
            expected: expected_version,
            found: obligation.version,
        });
    }
    obligation.status = status;
    obligation.version += 1;
    Ok(())
}
