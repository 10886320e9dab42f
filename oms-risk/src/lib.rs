#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Risk
//!
//! Pre-trade risk checks evaluated before an order reaches the gateway
//! (spec.md §4.3).

pub mod check;
pub mod engine;

pub use check::{MaxAbsPosition, MaxOpenOrderNotional, RiskCheck, RiskCheckError, RiskContext};
pub use engine::RiskEngine;
