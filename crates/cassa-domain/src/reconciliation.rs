//! Bank movements and externally suggested obligation matches.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::obligation::ObligationKind;

/// A line from a bank statement awaiting reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankMovement {
    pub id: Uuid,
    pub account_id: Uuid,
    pub operation_date: NaiveDate,
    /// Positive for credits, negative for debits.
    pub amount: Decimal,
    pub description: String,
}

impl BankMovement {
    pub fn kind(&self) -> Option<ObligationKind> {
        ObligationKind::from_movement(self.amount)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionState {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

/// A candidate match proposed by the inference collaborator. Never authoritative
/// until confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchSuggestion {
    pub movement_id: Uuid,
    pub obligation_id: Uuid,
    /// In `[0, 1]`.
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub state: SuggestionState,
}

impl MatchSuggestion {
    pub fn new(movement_id: Uuid, obligation_id: Uuid, confidence: f32) -> Self {
        Self {
            movement_id,
            obligation_id,
            confidence,
            rationale: None,
            state: SuggestionState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == SuggestionState::Pending
    }
}
