#![doc(test(attr(deny(warnings))))]

//! Liquidity Core wires the cassa crates into an operator shell: weekly cash
//! projections, rescheduling and settlement of scadenze, aging and position
//! reports over a JSON-backed obligation store.

pub mod cli;
pub mod errors;
pub mod utils;

pub use cassa_config as config;
pub use cassa_core as core;
pub use cassa_domain as domain;
pub use cassa_storage_json as storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Liquidity Core tracing initialized.");
    });
}
