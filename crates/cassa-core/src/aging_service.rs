use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use cassa_domain::{
    common::days_between, AgingBand, AgingLine, AgingReport, AgingSeverity, Obligation,
    ObligationKind,
};

use crate::{
    projection_service::counterparty_labels,
    storage::{Deadline, ObligationStore},
    time::Clock,
    CoreError,
};

pub struct AgingService;

impl AgingService {
    /// Groups overdue residuals of one kind into lateness bands as of today.
    pub fn report(
        store: &dyn ObligationStore,
        clock: &dyn Clock,
        kind: ObligationKind,
        deadline: Deadline,
    ) -> Result<AgingReport, CoreError> {
        let obligations = store.list_open_obligations(deadline)?;
        let counterparties = store.list_counterparties(deadline)?;
        deadline.check()?;
        let labels = counterparty_labels(&counterparties);
        Ok(build_report(clock.today(), kind, &obligations, &labels))
    }
}

/// Lateness is counted from the legal due date; planned dates do not excuse a delay.
pub fn build_report(
    reference: NaiveDate,
    kind: ObligationKind,
    obligations: &[Obligation],
    labels: &HashMap<Uuid, String>,
) -> AgingReport {
    let mut bands = AgingBand::standard_bands();
    let mut lines = Vec::new();

    for obligation in obligations {
        if obligation.kind != kind || obligation.is_settled() {
            continue;
        }
        let Some(due) = obligation.legal_due_date else {
            continue;
        };
        let residual = obligation.residual();
        if due >= reference || residual <= rust_decimal::Decimal::ZERO {
            continue;
        }
        let days_late = days_between(due, reference);
        if let Some(band) = bands.iter_mut().find(|band| band.accepts(days_late)) {
            band.amount += residual;
            band.count += 1;
        }
        lines.push(AgingLine {
            obligation_id: obligation.id,
            counterparty_label: labels
                .get(&obligation.counterparty_id)
                .cloned()
                .unwrap_or_else(|| obligation.counterparty_id.to_string()),
            invoice_ref: obligation.invoice_ref.clone(),
            legal_due_date: due,
            days_late,
            severity: AgingSeverity::classify(days_late),
            residual_amount: residual,
        });
    }

    lines.sort_by(|a, b| b.days_late.cmp(&a.days_late));
    AgingReport {
        kind,
        reference_date: reference,
        bands,
        lines,
    }
}
