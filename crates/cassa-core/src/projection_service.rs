//! Weekly liquidity forecast over open obligations.

use std::collections::HashMap;

use chrono::{Days, Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use cassa_domain::{
    account::opening_balance, common::*, AnomalyKind, BankAccount, Counterparty, DetailLine,
    Obligation, ProjectionAnomaly, ProjectionResult, WeekSlice,
};

use crate::{
    storage::{Deadline, ObligationStore},
    time::Clock,
    CoreError,
};

/// Caller knobs that do not change the shape of the series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionOptions {
    /// Weeks whose projected balance ends below this value are flagged.
    pub alert_threshold: Option<Decimal>,
    /// Deadline for the bulk reads, in milliseconds.
    pub read_timeout_ms: Option<u64>,
}

impl ProjectionOptions {
    pub fn with_alert_threshold(mut self, threshold: Decimal) -> Self {
        self.alert_threshold = Some(threshold);
        self
    }

    pub fn with_read_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.read_timeout_ms = Some(timeout_ms);
        self
    }
}

pub struct ProjectionService;

impl ProjectionService {
    /// Reads a fresh snapshot from `store` and projects it from `clock.today()`.
    ///
    /// Fails with `UpstreamTimeout` when the reads do not complete within
    /// `options.read_timeout_ms`; no partial series is ever returned.
    pub fn compute(
        store: &dyn ObligationStore,
        clock: &dyn Clock,
        horizon_days: i64,
        options: &ProjectionOptions,
    ) -> Result<ProjectionResult, CoreError> {
        let today = clock.today();
        validate_horizon(today, horizon_days)?;
        let deadline = Deadline::from_millis(options.read_timeout_ms);

        let accounts = store.list_active_accounts(deadline)?;
        deadline.check()?;
        let obligations = store.list_open_obligations(deadline)?;
        deadline.check()?;
        let counterparties = store.list_counterparties(deadline)?;
        deadline.check()?;

        let labels = counterparty_labels(&counterparties);
        let result = project(today, horizon_days, &accounts, &obligations, &labels, options)?;
        debug!(
            reference = %today,
            weeks = result.weeks.len(),
            obligations = obligations.len(),
            anomalies = result.anomalies.len(),
            "projection computed"
        );
        Ok(result)
    }
}

/// Checks `horizon_days` against `reference` and returns the last projected day.
///
/// Any positive horizon is accepted as long as its end is a representable date.
pub fn validate_horizon(reference: NaiveDate, horizon_days: i64) -> Result<NaiveDate, CoreError> {
    let days = u64::try_from(horizon_days)
        .ok()
        .filter(|days| *days > 0)
        .ok_or_else(|| {
            CoreError::InvalidArgument(format!(
                "horizon must be a positive number of days, got {horizon_days}"
            ))
        })?;
    reference.checked_add_days(Days::new(days)).ok_or_else(|| {
        CoreError::InvalidArgument(format!(
            "horizon of {horizon_days} days from {reference} is past the last supported date"
        ))
    })
}

/// Number of weekly buckets for a horizon: `ceil(horizon_days / 7)`.
pub fn bucket_count(horizon_days: i64) -> usize {
    let count = (horizon_days + DAYS_PER_WEEK - 1) / DAYS_PER_WEEK;
    usize::try_from(count).unwrap_or(0)
}

pub fn counterparty_labels(counterparties: &[Counterparty]) -> HashMap<Uuid, String> {
    counterparties
        .iter()
        .map(|counterparty| (counterparty.id, counterparty.name.clone()))
        .collect()
}

/// Projects `obligations` over `horizon_days` starting at `reference`.
///
/// Week `i` spans `reference + 7i ..= reference + 7i + 6`; the last week is
/// stretched or shortened to end at `reference + horizon_days`. Obligations
/// whose effective date precedes `reference` land in week 0, those past the
/// horizon are left out.
pub fn project(
    reference: NaiveDate,
    horizon_days: i64,
    accounts: &[BankAccount],
    obligations: &[Obligation],
    labels: &HashMap<Uuid, String>,
    options: &ProjectionOptions,
) -> Result<ProjectionResult, CoreError> {
    let horizon_end = validate_horizon(reference, horizon_days)?;
    let count = bucket_count(horizon_days);
    let mut weeks = build_weeks(reference, count, horizon_end);
    let mut anomalies = Vec::new();

    for obligation in obligations {
        match screen(obligation) {
            Screening::Project => {}
            Screening::Skip => continue,
            Screening::Reject(anomaly) => {
                warn!(
                    obligation = %obligation.id,
                    anomaly = %anomaly,
                    "obligation excluded from projection"
                );
                anomalies.push(ProjectionAnomaly {
                    obligation_id: obligation.id,
                    kind: anomaly,
                });
                continue;
            }
        }

        let Some(effective_date) = obligation.effective_date() else {
            continue;
        };
        let offset = days_between(reference, effective_date);
        if offset > horizon_days {
            continue;
        }
        let past_due = offset < 0;
        let index = if past_due {
            0
        } else {
            usize::try_from(offset / DAYS_PER_WEEK)
                .unwrap_or(0)
                .min(count - 1)
        };

        let line = DetailLine {
            obligation_id: obligation.id,
            counterparty_label: labels
                .get(&obligation.counterparty_id)
                .cloned()
                .unwrap_or_else(|| obligation.counterparty_id.to_string()),
            invoice_ref: obligation.invoice_ref.clone(),
            kind: obligation.kind,
            effective_date,
            residual_amount: obligation.residual(),
            past_due,
        };
        weeks[index].push_line(line);
    }

    let opening = opening_balance(accounts);
    let mut balance = opening;
    let mut first_negative_week = None;
    for week in &mut weeks {
        week.detail_lines.sort_by(|a, b| {
            a.effective_date
                .cmp(&b.effective_date)
                .then_with(|| a.counterparty_label.cmp(&b.counterparty_label))
        });
        balance = week.settle_balance(balance, options.alert_threshold);
        if first_negative_week.is_none() && week.is_negative() {
            first_negative_week = Some(week.index);
        }
    }

    Ok(ProjectionResult {
        reference_date: reference,
        horizon_days: u32::try_from(horizon_days).unwrap_or(u32::MAX),
        opening_balance: opening,
        weeks,
        has_negative_weeks: first_negative_week.is_some(),
        first_negative_week,
        anomalies,
    })
}

fn build_weeks(reference: NaiveDate, count: usize, horizon_end: NaiveDate) -> Vec<WeekSlice> {
    (0..count)
        .map(|index| {
            let start = reference + Duration::days(index as i64 * DAYS_PER_WEEK);
            let end = if index + 1 == count {
                horizon_end
            } else {
                week_end(start)
            };
            WeekSlice::new(index, start, end)
        })
        .collect()
}

enum Screening {
    Project,
    /// Nothing left to move.
    Skip,
    Reject(AnomalyKind),
}

fn screen(obligation: &Obligation) -> Screening {
    if obligation.is_settled() {
        return Screening::Reject(AnomalyKind::SettledInOpenSet);
    }
    if obligation.legal_due_date.is_none() {
        return Screening::Reject(AnomalyKind::MissingDueDate);
    }
    let residual = obligation.residual();
    if residual < Decimal::ZERO {
        Screening::Reject(AnomalyKind::NegativeResidual)
    } else if residual.is_zero() {
        Screening::Skip
    } else {
        Screening::Project
    }
}
