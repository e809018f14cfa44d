//! Stable, public-facing helpers that wrap the internal service layer.
//!
//! Frontends (CLI, batch jobs) call these instead of reaching into individual
//! services, so string inputs are validated in one place.

use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use cassa_domain::{Obligation, ObligationKind, PaymentMethod, ProjectionResult};

use crate::{
    projection_service::{ProjectionOptions, ProjectionService},
    schedule_service::ScheduleService,
    settlement_service::{SettlementRequest, SettlementService},
    storage::ObligationStore,
    time::{parse_date, Clock},
    CoreError,
};

/// Computes the weekly projection for `horizon_days` from today.
pub fn api_compute_projection(
    store: &dyn ObligationStore,
    clock: &dyn Clock,
    horizon_days: i64,
    options: &ProjectionOptions,
) -> Result<ProjectionResult, CoreError> {
    ProjectionService::compute(store, clock, horizon_days, options)
}

/// Reschedules an obligation to a `YYYY-MM-DD` date.
pub fn api_reschedule(
    store: &dyn ObligationStore,
    obligation_id: Uuid,
    planned_date: &str,
) -> Result<(), CoreError> {
    let date = parse_date(planned_date)?;
    ScheduleService::reschedule(store, obligation_id, date)
}

/// Records a payment from textual inputs. The date defaults to today.
pub fn api_settle(
    store: &dyn ObligationStore,
    clock: &dyn Clock,
    obligation_id: Uuid,
    amount: &str,
    settlement_date: Option<&str>,
    method: Option<&str>,
    attempts: u32,
) -> Result<Obligation, CoreError> {
    let amount = parse_amount(amount)?;
    let date = match settlement_date {
        Some(value) => parse_date(value)?,
        None => clock.today(),
    };
    let method = method.map(PaymentMethod::parse).unwrap_or_default();
    let request = SettlementRequest::new(obligation_id, amount, date).with_method(method);
    SettlementService::settle_with_retry(store, clock, &request, attempts)
}

pub fn parse_id(value: &str) -> Result<Uuid, CoreError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| CoreError::InvalidArgument(format!("`{value}` is not a valid identifier")))
}

/// Accepts `1234.56` as well as the Italian `1.234,56`.
pub fn parse_amount(value: &str) -> Result<Decimal, CoreError> {
    let trimmed = value.trim().trim_end_matches('€').trim();
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    Decimal::from_str(&normalized)
        .map_err(|_| CoreError::InvalidArgument(format!("`{value}` is not a valid amount")))
}

pub fn parse_kind(value: &str) -> Result<ObligationKind, CoreError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "in" | "inflow" | "entrata" => Ok(ObligationKind::Inflow),
        "out" | "outflow" | "uscita" => Ok(ObligationKind::Outflow),
        other => Err(CoreError::InvalidArgument(format!(
            "`{other}` is not a direction (use in or out)"
        ))),
    }
}
