use chrono::NaiveDate;
use rust_decimal::Decimal;

use cassa_domain::{account::opening_balance, BankAccount, Obligation, ObligationKind};

use crate::{
    storage::{Deadline, ObligationStore},
    time::Clock,
    CoreError,
};

/// Snapshot of cash against what is still owed in both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSummary {
    pub reference_date: NaiveDate,
    pub cash_on_hand: Decimal,
    pub receivables: Decimal,
    pub payables: Decimal,
    pub overdue_receivables: Decimal,
    pub overdue_payables: Decimal,
    pub open_obligations: usize,
    pub below_alert_threshold: bool,
}

impl PositionSummary {
    /// Cash plus receivables minus payables.
    pub fn net_position(&self) -> Decimal {
        self.cash_on_hand + self.receivables - self.payables
    }
}

pub struct SummaryService;

impl SummaryService {
    pub fn position(
        store: &dyn ObligationStore,
        clock: &dyn Clock,
        alert_threshold: Option<Decimal>,
        deadline: Deadline,
    ) -> Result<PositionSummary, CoreError> {
        let accounts = store.list_active_accounts(deadline)?;
        let obligations = store.list_open_obligations(deadline)?;
        deadline.check()?;
        Ok(summarize(clock.today(), &accounts, &obligations, alert_threshold))
    }
}

pub fn summarize(
    reference: NaiveDate,
    accounts: &[BankAccount],
    obligations: &[Obligation],
    alert_threshold: Option<Decimal>,
) -> PositionSummary {
    let cash_on_hand = opening_balance(accounts);
    let mut summary = PositionSummary {
        reference_date: reference,
        cash_on_hand,
        receivables: Decimal::ZERO,
        payables: Decimal::ZERO,
        overdue_receivables: Decimal::ZERO,
        overdue_payables: Decimal::ZERO,
        open_obligations: 0,
        below_alert_threshold: alert_threshold.is_some_and(|limit| cash_on_hand < limit),
    };

    for obligation in obligations.iter().filter(|obligation| !obligation.is_settled()) {
        let residual = obligation.residual();
        if residual <= Decimal::ZERO {
            continue;
        }
        summary.open_obligations += 1;
        let overdue = obligation
            .legal_due_date
            .is_some_and(|due| due < reference);
        match obligation.kind {
            ObligationKind::Inflow => {
                summary.receivables += residual;
                if overdue {
                    summary.overdue_receivables += residual;
                }
            }
            ObligationKind::Outflow => {
                summary.payables += residual;
                if overdue {
                    summary.overdue_payables += residual;
                }
            }
        }
    }
    summary
}
