//! cassa-core
//!
//! Liquidity projection and obligation lifecycle services.
//! Depends on cassa-domain. No CLI, no terminal I/O; persistence is reached only
//! through the `ObligationStore` trait handed in by the caller.

pub mod aging_service;
pub mod error;
pub mod format;
pub mod memory_store;
pub mod obligation_service;
pub mod projection_service;
pub mod public_api;
pub mod reconciliation_service;
pub mod schedule_service;
pub mod settlement_service;
pub mod status_service;
pub mod storage;
pub mod summary_service;
pub mod time;

pub use aging_service::*;
pub use error::CoreError;
pub use memory_store::InMemoryStore;
pub use obligation_service::*;
pub use projection_service::*;
pub use reconciliation_service::*;
pub use schedule_service::*;
pub use settlement_service::*;
pub use status_service::*;
pub use storage::*;
pub use summary_service::*;
pub use time::{Clock, FixedClock};

#[cfg(test)]
mod tests;
