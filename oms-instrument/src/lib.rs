#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Instrument
//!
//! Tick-quantized numeric types ([`Price`], [`Quantity`], [`CurrencyAmount`]) and the
//! immutable instrument catalog ([`Instrument`], [`InstrumentRegistry`]) shared by every
//! other crate in the OMS workspace.
//!
//! Instruments never mutate once registered: a [`InstrumentId`] is a dense, stable index
//! assigned once at subscription time and used everywhere else (order book keys, order
//! routing, position accounting) instead of passing symbols around.

pub mod currency;
pub mod exchange;
pub mod instrument;
pub mod keyed;
pub mod num;
pub mod side;

pub use currency::{Currency, CurrencyAmount};
pub use exchange::ExchangeId;
pub use instrument::{Instrument, InstrumentId, InstrumentRegistry, InstrumentSource};
pub use keyed::Keyed;
pub use num::{Price, Quantity, NumError, TICK_SCALE};
pub use side::Side;
