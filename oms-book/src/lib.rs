#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Book
//!
//! The L2 order book engine and market data distributor (spec.md §4.1, §4.2).
//!
//! [`book::OrderBook`] is created once per instrument at subscription time and
//! mutated only by the single [`distributor::MarketDataDistributor`] thread that
//! owns it; readers get wait-free access via [`book::OrderBookSnapshot`] or the
//! O(1) value-type accessors ([`book::OrderBook::best_bid`],
//! [`book::BookView::get_mid_price`], ...).

pub mod book;
pub mod distributor;
pub mod error;
pub mod event;

pub use book::{ApplyOutcome, BestOrderBook, BookView, OrderBook, OrderBookSnapshot};
pub use distributor::MarketDataDistributor;
pub use error::BookError;
pub use event::{MarketDataEvent, MarketDataEventKind, PriceLevelUpdate};
