//! cassa-domain
//!
//! Pure domain models (Obligation, BankAccount, Counterparty, projection buckets, aging).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod account;
pub mod aging;
pub mod common;
pub mod obligation;
pub mod projection;
pub mod reconciliation;

pub use account::*;
pub use aging::*;
pub use common::*;
pub use obligation::*;
pub use projection::*;
pub use reconciliation::*;

pub use rust_decimal::Decimal;
