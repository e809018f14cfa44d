use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use cassa_domain::{Obligation, ObligationStatus, PaymentMethod};

use crate::{
    storage::{ObligationStore, PaymentRecord},
    time::Clock,
    CoreError,
};

/// A payment to record against one obligation.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRequest {
    pub obligation_id: Uuid,
    pub amount: Decimal,
    pub settlement_date: NaiveDate,
    pub method: PaymentMethod,
}

impl SettlementRequest {
    pub fn new(obligation_id: Uuid, amount: Decimal, settlement_date: NaiveDate) -> Self {
        Self {
            obligation_id,
            amount,
            settlement_date,
            method: PaymentMethod::default(),
        }
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }
}

pub struct SettlementService;

impl SettlementService {
    /// Records a (partial) payment.
    ///
    /// The write is a compare-and-swap on the obligation version read here; a
    /// concurrent payment in between surfaces as `ConcurrencyConflict`. Amounts
    /// above the residual are rejected with `Overpayment` and nothing is written.
    pub fn settle_partial(
        store: &dyn ObligationStore,
        clock: &dyn Clock,
        request: &SettlementRequest,
    ) -> Result<Obligation, CoreError> {
        validate_amount(request.amount)?;
        let current = store.get_obligation(request.obligation_id)?;
        Self::apply(store, clock, &current, request)
    }

    /// Like [`SettlementService::settle_partial`], re-reading the obligation and
    /// retrying on `ConcurrencyConflict` up to `attempts` times in total.
    pub fn settle_with_retry(
        store: &dyn ObligationStore,
        clock: &dyn Clock,
        request: &SettlementRequest,
        attempts: u32,
    ) -> Result<Obligation, CoreError> {
        validate_amount(request.amount)?;
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            let current = store.get_obligation(request.obligation_id)?;
            match Self::apply(store, clock, &current, request) {
                Err(err @ CoreError::ConcurrencyConflict { .. }) if attempt < attempts => {
                    warn!(
                        obligation = %request.obligation_id,
                        attempt,
                        error = %err,
                        "settlement conflicted, retrying with fresh data"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn apply(
        store: &dyn ObligationStore,
        clock: &dyn Clock,
        current: &Obligation,
        request: &SettlementRequest,
    ) -> Result<Obligation, CoreError> {
        if current.is_settled() {
            return Err(CoreError::InvalidArgument(format!(
                "obligation {} is already settled",
                current.id
            )));
        }
        let residual = current.residual();
        if request.amount > residual {
            return Err(CoreError::Overpayment {
                id: current.id,
                residual,
                attempted: request.amount,
            });
        }

        let paid_after = current.paid_amount + request.amount;
        let resulting_status = ObligationStatus::derive(
            current.total_amount,
            paid_after,
            current.legal_due_date,
            clock.today(),
        );
        let record = PaymentRecord {
            obligation_id: current.id,
            expected_version: current.version,
            amount: request.amount,
            settlement_date: request.settlement_date,
            method: request.method.clone(),
            resulting_status,
        };
        let updated = store.apply_payment(&record)?;
        info!(
            obligation = %updated.id,
            amount = %request.amount,
            paid = %updated.paid_amount,
            status = %updated.status,
            "payment recorded"
        );
        Ok(updated)
    }
}

fn validate_amount(amount: Decimal) -> Result<(), CoreError> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidArgument(format!(
            "settlement amount must be positive, got {amount}"
        )));
    }
    Ok(())
}
