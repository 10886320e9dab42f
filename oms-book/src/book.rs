//! The L2 order book engine (spec.md §4.1).
//!
//! An [`OrderBook`] is created once per instrument at subscription time and lives
//! for the rest of the process: it is never destroyed, only ever mutated by the
//! single [`crate::distributor::MarketDataDistributor`] thread that owns that
//! instrument. Readers (the UI, persistence, fair-value providers) only ever see
//! [`OrderBookSnapshot`] copies or the O(1) value-type accessors below — never the
//! mutable sides directly.

use crate::error::BookError;
use crate::event::{MarketDataEvent, MarketDataEventKind, PriceLevelUpdate};
use oms_instrument::{
    exchange::ExchangeId,
    instrument::InstrumentId,
    num::{Price, Quantity},
    side::Side,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// What happened when an event was fed to [`OrderBook::apply_event`].
///
/// The spec's contract is a plain `bool` ("did it apply"); `ApplyOutcome::applied`
/// gives callers that, while `ApplyOutcome` itself lets tests and the distributor's
/// dropped-event metrics distinguish *why* it didn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// `event.sequence <= last_sequence`: stale or duplicate, dropped.
    Stale,
    /// `event.instrument_id` didn't match the book's instrument: dropped.
    Mismatched,
}

impl ApplyOutcome {
    pub fn applied(self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}

/// A trait common to [`OrderBook`] and [`BestOrderBook`] so that fair-value
/// providers (`oms-strategy::fair_value`) can be generic over full-depth vs. L1
/// feeds (spec.md §4.6).
pub trait BookView {
    fn instrument_id(&self) -> InstrumentId;
    fn best_bid(&self) -> (Price, Quantity);
    fn best_ask(&self) -> (Price, Quantity);

    fn get_spread(&self) -> Price {
        let (bid, _) = self.best_bid();
        let (ask, _) = self.best_ask();
        if bid.is_zero() || ask.is_zero() {
            Price::ZERO
        } else {
            ask - bid
        }
    }

    fn get_mid_price(&self) -> Price {
        let (bid, _) = self.best_bid();
        let (ask, _) = self.best_ask();
        if bid.is_zero() || ask.is_zero() {
            Price::ZERO
        } else {
            Price::from_ticks((bid.ticks() + ask.ticks()) / 2)
        }
    }
}

/// An immutable, owned copy of book state, safe to hand to readers off the
/// distributor thread (spec.md §4.1: "must be wait-free for readers").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: SmolStr,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
    pub update_count: u64,
    pub last_sequence: u64,
    pub last_timestamp_us: i64,
}

/// A full-depth, single-writer L2 order book for one instrument.
#[derive(Debug, Clone)]
pub struct OrderBook {
    instrument_id: InstrumentId,
    symbol: SmolStr,
    source_exchange: ExchangeId,
    tick_size: Price,
    lot_size: Quantity,
    // Keyed by `Reverse<Price>` so the best bid is always the first entry.
    bids: BTreeMap<Reverse<Price>, Quantity>,
    asks: BTreeMap<Price, Quantity>,
    last_sequence: u64,
    update_count: u64,
    last_timestamp_us: i64,
}

impl OrderBook {
    pub fn new(
        instrument_id: InstrumentId,
        symbol: impl Into<SmolStr>,
        source_exchange: ExchangeId,
        tick_size: Price,
        lot_size: Quantity,
    ) -> Self {
        Self {
            instrument_id,
            symbol: symbol.into(),
            source_exchange,
            tick_size,
            lot_size,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            last_sequence: 0,
            update_count: 0,
            last_timestamp_us: 0,
        }
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    pub fn source_exchange(&self) -> &ExchangeId {
        &self.source_exchange
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Apply a normalised market data event to this book.
    ///
    /// Stale/out-of-order events (`sequence <= last_sequence`) are dropped and
    /// logged at `WARN`; mismatched-instrument events are dropped silently to the
    /// caller but counted the same way. Snapshots are always accepted regardless
    /// of sequence and clear the book before repopulating it. A forward gap
    /// (`sequence > last_sequence + 1`) is *not* fatal here — per spec.md §4.1 the
    /// feed layer is responsible for requesting a fresh snapshot; this book just
    /// keeps trading on the data it has until one arrives.
    pub fn apply_event(&mut self, event: &MarketDataEvent) -> ApplyOutcome {
        if event.instrument_id != self.instrument_id {
            tracing::warn!(
                book = ?self.instrument_id,
                event = ?event.instrument_id,
                "dropping MarketDataEvent for mismatched instrument"
            );
            return ApplyOutcome::Mismatched;
        }

        if event.sequence <= self.last_sequence && self.last_sequence != 0 {
            tracing::warn!(
                instrument = ?self.instrument_id,
                event_seq = event.sequence,
                last_seq = self.last_sequence,
                "dropping out-of-order or duplicate MarketDataEvent"
            );
            return ApplyOutcome::Stale;
        }

        match event.kind {
            MarketDataEventKind::Snapshot => {
                self.bids.clear();
                self.asks.clear();
                for update in &event.updates {
                    self.apply_level(update);
                }
            }
            MarketDataEventKind::Add
            | MarketDataEventKind::Update
            | MarketDataEventKind::Delete => {
                for update in &event.updates {
                    self.apply_level(update);
                }
            }
            MarketDataEventKind::Trade => {
                // Trades don't mutate book levels; they only advance the sequence
                // and timestamp watermark below.
            }
        }

        self.last_sequence = event.sequence;
        self.update_count += 1;
        self.last_timestamp_us = event.timestamp_us;

        debug_assert!(
            self.validate_integrity(),
            "OrderBook integrity violated after apply_event"
        );

        ApplyOutcome::Applied
    }

    fn apply_level(&mut self, update: &PriceLevelUpdate) {
        let price = Price::from_ticks(update.price_ticks);
        let qty = Quantity::from_ticks(update.qty_ticks);
        match update.side {
            Side::Buy => {
                if qty.is_zero() {
                    self.bids.remove(&Reverse(price));
                } else {
                    self.bids.insert(Reverse(price), qty);
                }
            }
            Side::Sell => {
                if qty.is_zero() {
                    self.asks.remove(&price);
                } else {
                    self.asks.insert(price, qty);
                }
            }
        }
    }

    pub fn best_bid(&self) -> (Price, Quantity) {
        self.bids
            .iter()
            .next()
            .map(|(Reverse(p), q)| (*p, *q))
            .unwrap_or((Price::ZERO, Quantity::ZERO))
    }

    pub fn best_ask(&self) -> (Price, Quantity) {
        self.asks
            .iter()
            .next()
            .map(|(p, q)| (*p, *q))
            .unwrap_or((Price::ZERO, Quantity::ZERO))
    }

    pub fn get_spread(&self) -> Price {
        let (bid, _) = self.best_bid();
        let (ask, _) = self.best_ask();
        if bid.is_zero() || ask.is_zero() {
            Price::ZERO
        } else {
            ask - bid
        }
    }

    pub fn get_mid_price(&self) -> Price {
        let (bid, _) = self.best_bid();
        let (ask, _) = self.best_ask();
        if bid.is_zero() || ask.is_zero() {
            Price::ZERO
        } else {
            Price::from_ticks((bid.ticks() + ask.ticks()) / 2)
        }
    }

    /// The `n` best price levels on `side`, in priority order (best first).
    pub fn get_top_levels(&self, side: Side, n: usize) -> Vec<(Price, Quantity)> {
        match side {
            Side::Buy => self
                .bids
                .iter()
                .take(n)
                .map(|(Reverse(p), q)| (*p, *q))
                .collect(),
            Side::Sell => self.asks.iter().take(n).map(|(p, q)| (*p, *q)).collect(),
        }
    }

    /// Sum of quantity across the top `n` levels of `side` (used by VWAP and
    /// imbalance fair-value models).
    pub fn total_quantity(&self, side: Side, n: usize) -> Quantity {
        self.get_top_levels(side, n)
            .into_iter()
            .fold(Quantity::ZERO, |acc, (_, q)| acc + q)
    }

    /// A consistent, owned copy for UI/persistence/fair-value consumers.
    pub fn get_snapshot(&self, depth: usize) -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: self.symbol.clone(),
            bids: self.get_top_levels(Side::Buy, depth),
            asks: self.get_top_levels(Side::Sell, depth),
            update_count: self.update_count,
            last_sequence: self.last_sequence,
            last_timestamp_us: self.last_timestamp_us,
        }
    }

    /// Structural check: no crossed top-of-book, and every resting level is
    /// aligned to `tick_size`/`lot_size`. Used by tests and debug assertions, not
    /// on the hot path in release builds.
    pub fn validate_integrity(&self) -> bool {
        let (bid, _) = self.best_bid();
        let (ask, _) = self.best_ask();
        if !bid.is_zero() && !ask.is_zero() && bid >= ask {
            return false;
        }
        let levels_aligned = self
            .bids
            .iter()
            .all(|(Reverse(p), q)| p.is_aligned_to(self.tick_size) && q.is_aligned_to(self.lot_size))
            && self
                .asks
                .iter()
                .all(|(p, q)| p.is_aligned_to(self.tick_size) && q.is_aligned_to(self.lot_size));
        levels_aligned
    }
}

impl BookView for OrderBook {
    fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    fn best_bid(&self) -> (Price, Quantity) {
        OrderBook::best_bid(self)
    }

    fn best_ask(&self) -> (Price, Quantity) {
        OrderBook::best_ask(self)
    }
}

/// A degenerate order book holding only the two top-of-book entries, driven by a
/// bookTicker-style L1 feed (spec.md §4.1). Supplies the same [`BookView`]
/// interface as [`OrderBook`] for consumers that only need L1.
#[derive(Debug, Clone)]
pub struct BestOrderBook {
    instrument_id: InstrumentId,
    best_bid: (Price, Quantity),
    best_ask: (Price, Quantity),
    last_sequence: u64,
}

impl BestOrderBook {
    pub fn new(instrument_id: InstrumentId) -> Self {
        Self {
            instrument_id,
            best_bid: (Price::ZERO, Quantity::ZERO),
            best_ask: (Price::ZERO, Quantity::ZERO),
            last_sequence: 0,
        }
    }

    /// Apply a bookTicker-style event. Requires exactly two updates (one per
    /// side); anything else is rejected per spec.md §4.1.
    pub fn apply_event(&mut self, event: &MarketDataEvent) -> Result<ApplyOutcome, BookError> {
        if event.instrument_id != self.instrument_id {
            return Ok(ApplyOutcome::Mismatched);
        }
        if event.sequence <= self.last_sequence && self.last_sequence != 0 {
            return Ok(ApplyOutcome::Stale);
        }
        if event.update_count() != 2 {
            return Err(BookError::UnexpectedBestBookUpdateCount(
                event.update_count(),
            ));
        }
        for update in &event.updates {
            let price = Price::from_ticks(update.price_ticks);
            let qty = Quantity::from_ticks(update.qty_ticks);
            match update.side {
                Side::Buy => self.best_bid = (price, qty),
                Side::Sell => self.best_ask = (price, qty),
            }
        }
        self.last_sequence = event.sequence;
        Ok(ApplyOutcome::Applied)
    }
}

impl BookView for BestOrderBook {
    fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    fn best_bid(&self) -> (Price, Quantity) {
        self.best_bid
    }

    fn best_ask(&self) -> (Price, Quantity) {
        self.best_ask
    }
}
