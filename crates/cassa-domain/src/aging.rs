//! Aging of overdue residuals into lateness bands.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::obligation::ObligationKind;

/// Upper bounds (inclusive, in days late) of the standard aging bands.
pub const AGING_BAND_LIMITS: [(&str, Option<i64>); 4] = [
    ("0-30 gg", Some(30)),
    ("31-60 gg", Some(60)),
    ("61-90 gg", Some(90)),
    ("> 90 gg", None),
];

/// How urgently an overdue position needs a reminder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AgingSeverity {
    Recent,
    Serious,
    Critical,
}

impl AgingSeverity {
    pub fn classify(days_late: i64) -> Self {
        if days_late > 60 {
            AgingSeverity::Critical
        } else if days_late > 30 {
            AgingSeverity::Serious
        } else {
            AgingSeverity::Recent
        }
    }
}

impl fmt::Display for AgingSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgingSeverity::Recent => "Recente",
            AgingSeverity::Serious => "Grave",
            AgingSeverity::Critical => "Critico",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgingBand {
    pub label: String,
    pub max_days_late: Option<i64>,
    pub amount: Decimal,
    pub count: usize,
}

impl AgingBand {
    pub fn standard_bands() -> Vec<AgingBand> {
        AGING_BAND_LIMITS
            .iter()
            .map(|(label, max)| AgingBand {
                label: (*label).to_string(),
                max_days_late: *max,
                amount: Decimal::ZERO,
                count: 0,
            })
            .collect()
    }

    pub fn accepts(&self, days_late: i64) -> bool {
        self.max_days_late.map_or(true, |max| days_late <= max)
    }
}

/// Per-obligation row of the overdue list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgingLine {
    pub obligation_id: uuid::Uuid,
    pub counterparty_label: String,
    pub invoice_ref: Option<String>,
    pub legal_due_date: NaiveDate,
    pub days_late: i64,
    pub severity: AgingSeverity,
    pub residual_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgingReport {
    pub kind: ObligationKind,
    pub reference_date: NaiveDate,
    pub bands: Vec<AgingBand>,
    pub lines: Vec<AgingLine>,
}

impl AgingReport {
    pub fn total(&self) -> Decimal {
        self.bands.iter().map(|band| band.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_thresholds() {
        assert_eq!(AgingSeverity::classify(1), AgingSeverity::Recent);
        assert_eq!(AgingSeverity::classify(30), AgingSeverity::Recent);
        assert_eq!(AgingSeverity::classify(31), AgingSeverity::Serious);
        assert_eq!(AgingSeverity::classify(61), AgingSeverity::Critical);
    }

    #[test]
    fn last_band_is_open_ended() {
        let bands = AgingBand::standard_bands();
        assert_eq!(bands.len(), 4);
        assert!(!bands[2].accepts(91));
        assert!(bands[3].accepts(400));
    }
}
