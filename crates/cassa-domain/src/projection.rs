//! Weekly liquidity projection buckets and their result envelope.
//!
//! These types are produced fresh on every projection request and never persisted.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, obligation::ObligationKind};

/// One contributing obligation inside a week, for drill-down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailLine {
    pub obligation_id: Uuid,
    pub counterparty_label: String,
    pub invoice_ref: Option<String>,
    pub kind: ObligationKind,
    pub effective_date: NaiveDate,
    pub residual_amount: Decimal,
    /// Effective date precedes the reference date; absorbed into week 0.
    pub past_due: bool,
}

/// Weekly aggregation period of the forecast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekSlice {
    pub index: usize,
    pub period_label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub inflow_total: Decimal,
    pub outflow_total: Decimal,
    pub net_change: Decimal,
    pub projected_balance: Decimal,
    #[serde(default)]
    pub below_threshold: bool,
    #[serde(default)]
    pub detail_lines: Vec<DetailLine>,
}

impl WeekSlice {
    pub fn new(index: usize, period_start: NaiveDate, period_end: NaiveDate) -> Self {
        Self {
            index,
            period_label: week_label(period_start),
            period_start,
            period_end,
            inflow_total: Decimal::ZERO,
            outflow_total: Decimal::ZERO,
            net_change: Decimal::ZERO,
            projected_balance: Decimal::ZERO,
            below_threshold: false,
            detail_lines: Vec::new(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.period_start && date <= self.period_end
    }

    /// Adds a contributing obligation to the week totals.
    pub fn push_line(&mut self, line: DetailLine) {
        match line.kind {
            ObligationKind::Inflow => self.inflow_total += line.residual_amount,
            ObligationKind::Outflow => self.outflow_total += line.residual_amount,
        }
        self.net_change = self.inflow_total - self.outflow_total;
        self.detail_lines.push(line);
    }

    /// Closes the week against the previous running balance and returns the new one.
    pub fn settle_balance(&mut self, previous: Decimal, alert_threshold: Option<Decimal>) -> Decimal {
        self.projected_balance = previous + self.net_change;
        self.below_threshold = alert_threshold.is_some_and(|limit| self.projected_balance < limit);
        self.projected_balance
    }

    pub fn is_negative(&self) -> bool {
        self.projected_balance < Decimal::ZERO
    }
}

/// Why an obligation could not be placed in the series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    MissingDueDate,
    SettledInOpenSet,
    NegativeResidual,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnomalyKind::MissingDueDate => "missing legal due date",
            AnomalyKind::SettledInOpenSet => "settled obligation returned as open",
            AnomalyKind::NegativeResidual => "paid amount exceeds total",
        };
        f.write_str(label)
    }
}

/// An obligation excluded from the projection, reported instead of silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectionAnomaly {
    pub obligation_id: Uuid,
    pub kind: AnomalyKind,
}

/// Forward-looking weekly liquidity forecast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectionResult {
    pub reference_date: NaiveDate,
    pub horizon_days: u32,
    pub opening_balance: Decimal,
    pub weeks: Vec<WeekSlice>,
    pub has_negative_weeks: bool,
    pub first_negative_week: Option<usize>,
    #[serde(default)]
    pub anomalies: Vec<ProjectionAnomaly>,
}

impl ProjectionResult {
    /// Balance after the last week, or the opening balance for an empty series.
    pub fn closing_balance(&self) -> Decimal {
        self.weeks
            .last()
            .map(|week| week.projected_balance)
            .unwrap_or(self.opening_balance)
    }

    pub fn total_net_change(&self) -> Decimal {
        self.weeks.iter().map(|week| week.net_change).sum()
    }

    /// First week in which the projected balance goes below zero.
    pub fn first_shortfall(&self) -> Option<&WeekSlice> {
        self.first_negative_week
            .and_then(|index| self.weeks.get(index))
    }

    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }

    pub fn weeks_below_threshold(&self) -> impl Iterator<Item = &WeekSlice> {
        self.weeks.iter().filter(|week| week.below_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(kind: ObligationKind, amount: Decimal) -> DetailLine {
        DetailLine {
            obligation_id: Uuid::new_v4(),
            counterparty_label: "Edil Rossi".into(),
            invoice_ref: None,
            kind,
            effective_date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            residual_amount: amount,
            past_due: false,
        }
    }

    #[test]
    fn push_line_splits_totals_by_kind() {
        let start = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let mut week = WeekSlice::new(0, start, week_end(start));
        week.push_line(line(ObligationKind::Inflow, dec!(300.10)));
        week.push_line(line(ObligationKind::Outflow, dec!(120.05)));
        week.push_line(line(ObligationKind::Outflow, dec!(0.05)));

        assert_eq!(week.inflow_total, dec!(300.10));
        assert_eq!(week.outflow_total, dec!(120.10));
        assert_eq!(week.net_change, dec!(180.00));
        assert_eq!(week.detail_lines.len(), 3);
    }

    #[test]
    fn settle_balance_flags_threshold() {
        let start = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let mut week = WeekSlice::new(0, start, week_end(start));
        week.push_line(line(ObligationKind::Outflow, dec!(700)));

        let balance = week.settle_balance(dec!(5000), Some(dec!(5000)));
        assert_eq!(balance, dec!(4300));
        assert!(week.below_threshold);
        assert!(!week.is_negative());
    }
}
