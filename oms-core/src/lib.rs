#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Core
//!
//! Process wiring for the market-making OMS: configuration, logging,
//! shutdown, the top-level error type, and [`engine::InstrumentEngine`],
//! which threads market data through fair value and quoting per instrument.

pub mod config;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod logging;
pub mod shutdown;

pub use config::OmsConfig;
pub use engine::{InstrumentEngine, InstrumentEngineBuilder};
pub use error::{ConfigurationError, OmsError};
pub use interfaces::{ControlCommand, ControlEvent, ControlProtocol, FeedAdapter, FeedEvent, FillStore};
