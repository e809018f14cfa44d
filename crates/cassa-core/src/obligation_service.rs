use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use cassa_domain::{Obligation, ObligationKind};

use crate::{storage::ObligationStore, time::Clock, CoreError};

/// Input for registering a new obligation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObligation {
    pub kind: ObligationKind,
    pub counterparty_id: Uuid,
    pub total_amount: Decimal,
    pub legal_due_date: Option<NaiveDate>,
    pub invoice_ref: Option<String>,
    pub description: Option<String>,
    pub site_id: Option<Uuid>,
    pub issue_date: Option<NaiveDate>,
    pub planned_settlement_date: Option<NaiveDate>,
}

impl NewObligation {
    pub fn new(
        kind: ObligationKind,
        counterparty_id: Uuid,
        total_amount: Decimal,
        legal_due_date: NaiveDate,
    ) -> Self {
        Self {
            kind,
            counterparty_id,
            total_amount,
            legal_due_date: Some(legal_due_date),
            invoice_ref: None,
            description: None,
            site_id: None,
            issue_date: None,
            planned_settlement_date: None,
        }
    }
}

pub struct ObligationService;

impl ObligationService {
    /// Validates and persists a new unpaid obligation.
    pub fn register(
        store: &dyn ObligationStore,
        clock: &dyn Clock,
        input: NewObligation,
    ) -> Result<Obligation, CoreError> {
        if input.total_amount <= Decimal::ZERO {
            return Err(CoreError::InvalidArgument(format!(
                "total amount must be positive, got {}",
                input.total_amount
            )));
        }
        let due = input.legal_due_date.ok_or_else(|| {
            CoreError::InvalidArgument("a legal due date is required".into())
        })?;
        if input.invoice_ref.as_deref().is_some_and(|value| value.trim().is_empty()) {
            return Err(CoreError::InvalidArgument(
                "invoice reference cannot be blank".into(),
            ));
        }

        let mut obligation =
            Obligation::new(input.kind, input.counterparty_id, input.total_amount, due);
        obligation.invoice_ref = input.invoice_ref.map(|value| value.trim().to_string());
        obligation.description = input.description;
        obligation.site_id = input.site_id;
        obligation.issue_date = input.issue_date;
        obligation.planned_settlement_date = input.planned_settlement_date;
        obligation.status = obligation.derived_status(clock.today());

        store.insert_obligation(&obligation)?;
        info!(
            obligation = %obligation.id,
            kind = %obligation.kind,
            amount = %obligation.total_amount,
            due = %due,
            "obligation registered"
        );
        Ok(obligation)
    }

    /// Attributes an obligation to a construction site, or clears the attribution.
    pub fn assign_site(
        store: &dyn ObligationStore,
        obligation_id: Uuid,
        site_id: Option<Uuid>,
    ) -> Result<(), CoreError> {
        store.update_obligation_site(obligation_id, site_id)?;
        info!(obligation = %obligation_id, site = ?site_id, "site assignment updated");
        Ok(())
    }
}
