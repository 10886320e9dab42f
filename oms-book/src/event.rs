//! The wire shape market data arrives in, normalised across feed adapters.

use oms_instrument::{exchange::ExchangeId, instrument::InstrumentId, side::Side};
use serde::{Deserialize, Serialize};

/// One price-level mutation within a [`MarketDataEvent`].
///
/// `qty_ticks == 0` on a [`MarketDataEventKind::Delete`] means "remove this level
/// entirely"; on any other kind it means "set the level to this quantity"
/// (insert if absent, replace if present).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevelUpdate {
    pub side: Side,
    pub price_ticks: i64,
    pub qty_ticks: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketDataEventKind {
    /// Full-depth replacement: the book is cleared then repopulated from `updates`.
    Snapshot,
    Add,
    Update,
    Delete,
    Trade,
}

/// A normalised market data event, identical in shape regardless of which feed
/// adapter produced it (spec.md §3, §6 — adapters must honor this schema
/// bit-for-bit).
///
/// Sequences are per-(`source_exchange`, `instrument_id`) monotonic; ordering
/// across different instruments or exchanges is not guaranteed or required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataEvent {
    pub sequence: u64,
    pub timestamp_us: i64,
    pub kind: MarketDataEventKind,
    pub instrument_id: InstrumentId,
    pub source_exchange: ExchangeId,
    pub updates: Vec<PriceLevelUpdate>,
}

impl MarketDataEvent {
    pub fn update_count(&self) -> usize {
        self.updates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip_preserves_all_fields() {
        let event = MarketDataEvent {
            sequence: 42,
            timestamp_us: 1_700_000_000_000_000,
            kind: MarketDataEventKind::Add,
            instrument_id: InstrumentId(7),
            source_exchange: ExchangeId::Binance,
            updates: vec![PriceLevelUpdate {
                side: Side::Buy,
                price_ticks: 500_000_000,
                qty_ticks: 10_000,
            }],
        };
        let json = serde_json::to_string(&event).unwrap();
        let round_tripped: MarketDataEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, round_tripped);
    }
}
