//! Local stand-in for the bank reconciliation assistant: scores open
//! obligations against a bank movement by residual amount and invoice
//! reference. Its output goes through `ReconciliationService::propose` like
//! any other oracle and is only applied on explicit confirmation.

use rust_decimal::Decimal;

use cassa_core::{CoreError, MatchOracle};
use cassa_domain::{BankMovement, MatchSuggestion, Obligation};

/// Movement and suggestions awaiting `match confirm` or `match reject`.
#[derive(Debug, Clone)]
pub struct PendingReconciliation {
    pub movement: BankMovement,
    pub suggestions: Vec<MatchSuggestion>,
}

#[derive(Debug, Clone)]
pub struct ResidualMatchOracle {
    /// Relative shortfall below the residual still considered a near match.
    /// Movements above the residual are never suggested.
    pub tolerance: Decimal,
}

impl Default for ResidualMatchOracle {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(2, 2),
        }
    }
}

impl ResidualMatchOracle {
    fn score(&self, movement: &BankMovement, obligation: &Obligation) -> Option<(f32, String)> {
        let target = movement.amount.abs();
        let residual = obligation.residual();
        if target > residual {
            return None;
        }
        let (mut confidence, mut reason) = if residual == target {
            (0.8, "importo uguale al residuo".to_string())
        } else if residual - target <= residual * self.tolerance {
            (0.5, "importo vicino al residuo".to_string())
        } else {
            (0.2, "possibile acconto".to_string())
        };

        let description = movement.description.to_lowercase();
        if let Some(invoice) = obligation.invoice_ref.as_deref() {
            if !invoice.is_empty() && description.contains(&invoice.to_lowercase()) {
                confidence += 0.15;
                reason.push_str(", riferimento fattura nella causale");
            }
        }
        Some((confidence, reason))
    }
}

impl MatchOracle for ResidualMatchOracle {
    fn suggest(
        &self,
        movement: &BankMovement,
        candidates: &[Obligation],
    ) -> Result<Vec<MatchSuggestion>, CoreError> {
        Ok(candidates
            .iter()
            .filter_map(|obligation| {
                let (confidence, reason) = self.score(movement, obligation)?;
                let mut suggestion =
                    MatchSuggestion::new(movement.id, obligation.id, confidence);
                suggestion.rationale = Some(reason);
                Some(suggestion)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use cassa_domain::ObligationKind;

    fn movement(amount: Decimal, description: &str) -> BankMovement {
        BankMovement {
            id: Uuid::new_v4(),
            account_id: Uuid::nil(),
            operation_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            amount,
            description: description.into(),
        }
    }

    fn obligation(total: Decimal, invoice: &str) -> Obligation {
        Obligation::new(
            ObligationKind::Inflow,
            Uuid::new_v4(),
            total,
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        )
        .with_invoice_ref(invoice)
    }

    #[test]
    fn exact_residual_with_invoice_scores_highest() {
        let oracle = ResidualMatchOracle::default();
        let exact = obligation(dec!(1200), "FT-12");
        let near = obligation(dec!(1210), "FT-13");
        let larger = obligation(dec!(5000), "FT-14");
        let smaller = obligation(dec!(900), "FT-15");

        let suggestions = oracle
            .suggest(
                &movement(dec!(1200), "Bonifico saldo FT-12"),
                &[exact.clone(), near.clone(), larger.clone(), smaller],
            )
            .unwrap();

        assert_eq!(suggestions.len(), 3);
        let exact_score = suggestions
            .iter()
            .find(|s| s.obligation_id == exact.id)
            .unwrap();
        assert!((exact_score.confidence - 0.95).abs() < 1e-6);
        let near_score = suggestions.iter().find(|s| s.obligation_id == near.id).unwrap();
        assert!((near_score.confidence - 0.5).abs() < 1e-6);
        let partial = suggestions.iter().find(|s| s.obligation_id == larger.id).unwrap();
        assert_eq!(partial.rationale.as_deref(), Some("possibile acconto"));
    }

    #[test]
    fn movement_above_residual_is_not_suggested() {
        let oracle = ResidualMatchOracle::default();
        let invoice = obligation(dec!(1000), "FT-20");

        let above = oracle
            .suggest(&movement(dec!(1010), "Bonifico FT-20"), &[invoice.clone()])
            .unwrap();
        assert!(above.is_empty());

        let below = oracle
            .suggest(&movement(dec!(990), "Bonifico"), &[invoice])
            .unwrap();
        assert_eq!(below.len(), 1);
        assert_eq!(below[0].rationale.as_deref(), Some("importo vicino al residuo"));
    }
}
