//! Domain models for payment obligations (scadenze) and their lifecycle.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether settling the obligation brings cash in or sends it out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    #[serde(alias = "entrata")]
    Inflow,
    #[serde(alias = "uscita")]
    Outflow,
}

impl ObligationKind {
    /// Applies the cash direction of this kind to an unsigned amount.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            ObligationKind::Inflow => amount,
            ObligationKind::Outflow => -amount,
        }
    }

    /// Kind matching the sign of a bank movement; `None` for zero.
    pub fn from_movement(amount: Decimal) -> Option<Self> {
        if amount > Decimal::ZERO {
            Some(ObligationKind::Inflow)
        } else if amount < Decimal::ZERO {
            Some(ObligationKind::Outflow)
        } else {
            None
        }
    }
}

impl fmt::Display for ObligationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObligationKind::Inflow => "IN",
            ObligationKind::Outflow => "OUT",
        };
        f.write_str(label)
    }
}

/// Stored lifecycle state of an obligation.
///
/// `Settled` is terminal. The other three are a function of the paid amount and
/// the legal due date, see [`ObligationStatus::derive`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    #[default]
    #[serde(alias = "da_pagare")]
    Open,
    #[serde(alias = "parziale")]
    PartiallyPaid,
    #[serde(alias = "pagato")]
    Settled,
    #[serde(alias = "scaduto")]
    Overdue,
}

impl ObligationStatus {
    /// Computes the status implied by the amounts and the due date as of `today`.
    pub fn derive(
        total_amount: Decimal,
        paid_amount: Decimal,
        legal_due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        if paid_amount >= total_amount {
            return ObligationStatus::Settled;
        }
        if legal_due_date.is_some_and(|due| due < today) {
            return ObligationStatus::Overdue;
        }
        if paid_amount > Decimal::ZERO {
            ObligationStatus::PartiallyPaid
        } else {
            ObligationStatus::Open
        }
    }

    pub fn is_settled(self) -> bool {
        matches!(self, ObligationStatus::Settled)
    }
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObligationStatus::Open => "Open",
            ObligationStatus::PartiallyPaid => "Partially paid",
            ObligationStatus::Settled => "Settled",
            ObligationStatus::Overdue => "Overdue",
        };
        f.write_str(label)
    }
}

/// How a settlement was carried out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    #[serde(alias = "bonifico")]
    BankTransfer,
    Riba,
    #[serde(alias = "contanti")]
    Cash,
    #[serde(alias = "carta")]
    Card,
    #[serde(alias = "assegno")]
    Check,
    Other(String),
}

impl PaymentMethod {
    /// Parses a user-supplied label; unknown labels are kept verbatim.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "bank_transfer" | "transfer" | "bonifico" => PaymentMethod::BankTransfer,
            "riba" => PaymentMethod::Riba,
            "cash" | "contanti" => PaymentMethod::Cash,
            "card" | "carta" => PaymentMethod::Card,
            "check" | "cheque" | "assegno" => PaymentMethod::Check,
            other => PaymentMethod::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::BankTransfer => f.write_str("bank transfer"),
            PaymentMethod::Riba => f.write_str("RiBa"),
            PaymentMethod::Cash => f.write_str("cash"),
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::Check => f.write_str("check"),
            PaymentMethod::Other(label) => f.write_str(label),
        }
    }
}

/// A scheduled money movement tracked until settled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Obligation {
    pub id: Uuid,
    pub kind: ObligationKind,
    pub counterparty_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub paid_amount: Decimal,
    /// Imported records may lack a due date; such obligations cannot be projected.
    #[serde(default)]
    pub legal_due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_settlement_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub status: ObligationStatus,
    /// Row version, bumped on every payment or status write. Used for compare-and-swap.
    #[serde(default)]
    pub version: u64,
}

impl Obligation {
    pub fn new(
        kind: ObligationKind,
        counterparty_id: Uuid,
        total_amount: Decimal,
        legal_due_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            counterparty_id,
            site_id: None,
            invoice_ref: None,
            description: None,
            total_amount,
            paid_amount: Decimal::ZERO,
            legal_due_date: Some(legal_due_date),
            planned_settlement_date: None,
            issue_date: None,
            settlement_date: None,
            payment_method: None,
            status: ObligationStatus::Open,
            version: 0,
        }
    }

    pub fn with_invoice_ref(mut self, invoice_ref: impl Into<String>) -> Self {
        self.invoice_ref = Some(invoice_ref.into());
        self
    }

    pub fn with_planned_date(mut self, planned: NaiveDate) -> Self {
        self.planned_settlement_date = Some(planned);
        self
    }

    /// Unpaid portion. May be negative only for corrupt records.
    pub fn residual(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }

    /// Planned settlement date when set, legal due date otherwise.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.planned_settlement_date.or(self.legal_due_date)
    }

    pub fn derived_status(&self, today: NaiveDate) -> ObligationStatus {
        ObligationStatus::derive(
            self.total_amount,
            self.paid_amount,
            self.legal_due_date,
            today,
        )
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }
}
