//! Emission-factor matching and CO2e calculation.
//!
//! A free-text activity ("30-ton rigid diesel truck, 75 km") is split into
//! entities by the language-model oracle, matched against a catalog of
//! emission factors, and multiplied out with unit-aware arithmetic.

pub mod calc;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod extract;
pub mod lang;
mod markdown;
pub mod model;
pub mod oracle;
pub mod report;
pub mod retrieve;
pub mod score;
pub mod search;
pub mod units;

pub const USER_AGENT: &str = concat!("factorscout/", env!("CARGO_PKG_VERSION"));
