#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Integration
//!
//! Low-level, dependency-light plumbing shared by every event-fan-out component in
//! the OMS: a bounded single-producer/single-consumer ring buffer
//! ([`ring::SpscRing`]) with drop-on-full backpressure and per-topic counters, plus
//! the small collection aliases ([`collection::FnvIndexMap`]) used to keep
//! instrument/exchange-keyed lookups cheap.
//!
//! This crate intentionally has no knowledge of order books, orders, or strategies —
//! it is the substrate `oms-book` and `oms-execution` build their single-writer
//! rings on top of.

pub mod collection;
pub mod error;
pub mod ring;

pub use error::SocketError;
