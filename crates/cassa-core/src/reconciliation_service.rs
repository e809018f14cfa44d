//! Human-in-the-loop matching of bank movements to open obligations.
//!
//! Suggestions come from an external inference collaborator and are treated as
//! untrusted until a user confirms them.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use cassa_domain::{BankMovement, MatchSuggestion, Obligation, PaymentMethod, SuggestionState};

use crate::{
    settlement_service::{SettlementRequest, SettlementService},
    storage::{Deadline, ObligationStore},
    time::Clock,
    CoreError,
};

/// External service that ranks candidate obligations for a movement.
pub trait MatchOracle: Send + Sync {
    fn suggest(
        &self,
        movement: &BankMovement,
        candidates: &[Obligation],
    ) -> Result<Vec<MatchSuggestion>, CoreError>;
}

pub struct ReconciliationService;

impl ReconciliationService {
    /// Open obligations of the kind matching the movement sign whose residual
    /// covers the whole movement, so a confirmed match never overpays.
    pub fn candidates_for(movement: &BankMovement, open: &[Obligation]) -> Vec<Obligation> {
        let Some(kind) = movement.kind() else {
            return Vec::new();
        };
        let amount = movement.amount.abs();
        open.iter()
            .filter(|obligation| {
                obligation.kind == kind
                    && !obligation.is_settled()
                    && obligation.residual() >= amount
            })
            .cloned()
            .collect()
    }

    /// Asks the oracle for matches and sanitizes what comes back.
    ///
    /// Suggestions for unknown obligations are dropped, confidence is clamped to
    /// `[0, 1]`, duplicates keep their best score, and everything is returned
    /// pending, best first.
    pub fn propose(
        store: &dyn ObligationStore,
        oracle: &dyn MatchOracle,
        movement: &BankMovement,
    ) -> Result<Vec<MatchSuggestion>, CoreError> {
        if movement.kind().is_none() {
            return Err(CoreError::InvalidArgument(format!(
                "movement {} has a zero amount",
                movement.id
            )));
        }
        let open = store.list_open_obligations(Deadline::none())?;
        let candidates = Self::candidates_for(movement, &open);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let known: HashSet<_> = candidates.iter().map(|obligation| obligation.id).collect();

        let mut best: HashMap<uuid::Uuid, MatchSuggestion> = HashMap::new();
        for mut suggestion in oracle.suggest(movement, &candidates)? {
            if !known.contains(&suggestion.obligation_id) {
                debug!(obligation = %suggestion.obligation_id, "oracle suggested unknown obligation");
                continue;
            }
            suggestion.movement_id = movement.id;
            suggestion.confidence = clamp_confidence(suggestion.confidence);
            suggestion.state = SuggestionState::Pending;
            match best.get(&suggestion.obligation_id) {
                Some(existing) if existing.confidence >= suggestion.confidence => {}
                _ => {
                    best.insert(suggestion.obligation_id, suggestion);
                }
            }
        }

        let mut suggestions: Vec<_> = best.into_values().collect();
        suggestions.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.obligation_id.cmp(&b.obligation_id))
        });
        Ok(suggestions)
    }

    /// Applies the movement as a payment on the suggested obligation.
    pub fn confirm(
        store: &dyn ObligationStore,
        clock: &dyn Clock,
        suggestion: &mut MatchSuggestion,
        movement: &BankMovement,
        method: PaymentMethod,
    ) -> Result<Obligation, CoreError> {
        ensure_pending(suggestion)?;
        if suggestion.movement_id != movement.id {
            return Err(CoreError::InvalidArgument(format!(
                "suggestion belongs to movement {}, not {}",
                suggestion.movement_id, movement.id
            )));
        }
        let request = SettlementRequest::new(
            suggestion.obligation_id,
            movement.amount.abs(),
            movement.operation_date,
        )
        .with_method(method);
        let updated = SettlementService::settle_partial(store, clock, &request)?;
        suggestion.state = SuggestionState::Confirmed;
        info!(
            movement = %movement.id,
            obligation = %updated.id,
            "reconciliation confirmed"
        );
        Ok(updated)
    }

    pub fn reject(suggestion: &mut MatchSuggestion) -> Result<(), CoreError> {
        ensure_pending(suggestion)?;
        suggestion.state = SuggestionState::Rejected;
        Ok(())
    }
}

fn ensure_pending(suggestion: &MatchSuggestion) -> Result<(), CoreError> {
    if suggestion.is_pending() {
        Ok(())
    } else {
        Err(CoreError::InvalidArgument(format!(
            "suggestion for obligation {} was already {:?}",
            suggestion.obligation_id, suggestion.state
        )))
    }
}

fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
