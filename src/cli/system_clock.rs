use chrono::{DateTime, Utc};

use cassa_core::Clock;

/// Wall clock. Today is the UTC calendar day.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
