//! cassa-config
//!
//! Operator preferences for the liquidity tools: locale, projection defaults,
//! alert threshold and store settings, plus their on-disk persistence.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{Config, Theme};
