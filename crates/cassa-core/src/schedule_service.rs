use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::{storage::ObligationStore, CoreError};

pub struct ScheduleService;

impl ScheduleService {
    /// Moves the planned settlement date of an obligation.
    ///
    /// Only `planned_settlement_date` changes; the legal due date, paid amount
    /// and status are left as they are. Any projection computed earlier is stale
    /// once this returns.
    pub fn reschedule(
        store: &dyn ObligationStore,
        obligation_id: Uuid,
        planned_date: NaiveDate,
    ) -> Result<(), CoreError> {
        store.update_obligation_planned_date(obligation_id, Some(planned_date))?;
        info!(obligation = %obligation_id, planned = %planned_date, "obligation rescheduled");
        Ok(())
    }

    /// Drops the planned date so the obligation projects on its legal due date again.
    pub fn clear_plan(store: &dyn ObligationStore, obligation_id: Uuid) -> Result<(), CoreError> {
        store.update_obligation_planned_date(obligation_id, None)?;
        info!(obligation = %obligation_id, "planned date cleared");
        Ok(())
    }
}
