use tracing::{info, warn};

use cassa_domain::ObligationStatus;

use crate::{
    storage::{Deadline, ObligationStore, StoreError},
    time::Clock,
    CoreError,
};

pub struct StatusService;

impl StatusService {
    /// Persists `Overdue` on every open obligation whose legal due date has passed.
    ///
    /// Rows that changed version since the read (a payment landed meanwhile) are
    /// skipped and picked up by the next sweep. Returns the number of rows updated.
    pub fn sweep_overdue(store: &dyn ObligationStore, clock: &dyn Clock) -> Result<usize, CoreError> {
        let today = clock.today();
        let open = store.list_open_obligations(Deadline::none())?;
        let mut updated = 0;

        for obligation in open.iter().filter(|obligation| !obligation.is_settled()) {
            if obligation.status == ObligationStatus::Overdue
                || obligation.derived_status(today) != ObligationStatus::Overdue
            {
                continue;
            }
            match store.update_obligation_status(
                obligation.id,
                obligation.version,
                ObligationStatus::Overdue,
            ) {
                Ok(()) => updated += 1,
                Err(StoreError::VersionMismatch { id, .. }) => {
                    warn!(obligation = %id, "obligation changed during sweep, skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(updated, reference = %today, "overdue sweep completed");
        Ok(updated)
    }
}
