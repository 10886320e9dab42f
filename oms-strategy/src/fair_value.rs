//! Fair value providers (spec.md §4.6): each model maps an order book to a
//! `{fair_bid, fair_ask}` pair the [`crate::quote::QuotingInstance`] quotes
//! spread/skew around. Models are a closed enum rather than a trait object —
//! there is a small, fixed set of them and each needs different inputs
//! (ladder depth for VWAP/imbalance, accumulator state for `Penalty`), so a
//! `match` is clearer than a trait with mostly-unused methods.

use oms_book::{BookView, OrderBook};
use oms_instrument::instrument::InstrumentId;
use oms_instrument::num::Price;
use oms_instrument::side::Side;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FairValueUpdate {
    pub instrument_id: InstrumentId,
    pub fair_bid: Price,
    pub fair_ask: Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairValueModel {
    /// Mid of the raw best bid/ask.
    Midp,
    /// Mid of the best bid/ask, sourced from an L1 (bookTicker) feed.
    BestMidp,
    /// `fair_bid = best_ask`, `fair_ask = best_bid` — deliberately inverted,
    /// for strategies that want to be the aggressor.
    OppositeBest,
    /// Floor bid / ceil ask to a grouping multiple `G` of `tick_size` chosen
    /// so `G · tick_size` approximates one basis point of the current mid,
    /// then take the mid of the grouped quotes.
    GroupedMidp,
    /// VWAP of each side's top `depth` levels, then mid of the two VWAPs.
    VwapMidp { depth: usize },
    /// Volume-weighted fair price within `band_bps` of mid:
    /// `fair = ask · ratio + bid · (1 − ratio)`, `ratio = bid_qty / (bid_qty + ask_qty)`.
    OrderBookImbalance { band_bps: i64, depth: usize },
    /// Stateful: tracks a per-side penalty that widens on spread expansion
    /// (`× expand_multiplier`) and shrinks back (`× shrink_multiplier`),
    /// clamped at zero. `fair_ask = best_bid + acc_ask_penalty`,
    /// `fair_bid = best_ask − acc_bid_penalty`.
    Penalty {
        expand_multiplier: Decimal,
        shrink_multiplier: Decimal,
    },
}

/// A model plus whatever state it needs across updates (`Penalty`'s
/// accumulators, the dedupe watermark every model shares).
#[derive(Debug, Clone)]
pub struct FairValueProvider {
    instrument_id: InstrumentId,
    model: FairValueModel,
    tick_size: Price,
    last_emitted: Option<(Price, Price)>,
    acc_bid_penalty: Price,
    acc_ask_penalty: Price,
    last_spread: Price,
}

impl FairValueProvider {
    pub fn new(instrument_id: InstrumentId, model: FairValueModel, tick_size: Price) -> Self {
        Self {
            instrument_id,
            model,
            tick_size,
            last_emitted: None,
            acc_bid_penalty: Price::ZERO,
            acc_ask_penalty: Price::ZERO,
            last_spread: Price::ZERO,
        }
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    /// Entry point for models driven off a full-depth book. Valid for every
    /// model.
    pub fn update_from_book(&mut self, book: &OrderBook) -> Option<FairValueUpdate> {
        let (fair_bid, fair_ask) = match self.model {
            FairValueModel::Midp | FairValueModel::BestMidp | FairValueModel::OppositeBest => {
                self.simple_pair(book)?
            }
            FairValueModel::GroupedMidp => self.grouped_midp(book)?,
            FairValueModel::VwapMidp { depth } => self.vwap_midp(book, depth)?,
            FairValueModel::OrderBookImbalance { band_bps, depth } => {
                self.imbalance(book, band_bps, depth)?
            }
            FairValueModel::Penalty { expand_multiplier, shrink_multiplier } => {
                self.penalty(book, expand_multiplier, shrink_multiplier)?
            }
        };
        self.emit_if_changed(fair_bid, fair_ask)
    }

    /// Entry point for models driven off an L1-only (bookTicker) feed. Only
    /// `Midp`/`BestMidp`/`OppositeBest` make sense without ladder depth;
    /// anything else returns `None`.
    pub fn update_from_view(&mut self, view: &dyn BookView) -> Option<FairValueUpdate> {
        match self.model {
            FairValueModel::Midp | FairValueModel::BestMidp | FairValueModel::OppositeBest => {
                let (bid, ask) = self.pair_from_bbo(view.best_bid().0, view.best_ask().0)?;
                self.emit_if_changed(bid, ask)
            }
            _ => None,
        }
    }

    fn pair_from_bbo(&self, best_bid: Price, best_ask: Price) -> Option<(Price, Price)> {
        if best_bid.is_zero() || best_ask.is_zero() {
            return None;
        }
        Some(match self.model {
            FairValueModel::OppositeBest => (best_ask, best_bid),
            _ => {
                let mid = Price::from_ticks((best_bid.ticks() + best_ask.ticks()) / 2);
                (mid, mid)
            }
        })
    }

    fn simple_pair(&self, book: &OrderBook) -> Option<(Price, Price)> {
        self.pair_from_bbo(book.best_bid().0, book.best_ask().0)
    }

    fn grouped_midp(&self, book: &OrderBook) -> Option<(Price, Price)> {
        let (best_bid, _) = book.best_bid();
        let (best_ask, _) = book.best_ask();
        if best_bid.is_zero() || best_ask.is_zero() {
            return None;
        }
        let mid = Price::from_ticks((best_bid.ticks() + best_ask.ticks()) / 2);
        // G · tick_size ≈ 1 bp of mid, i.e. G ≈ mid / (10_000 · tick_size).
        let tick_ticks = self.tick_size.ticks().max(1);
        let group = ((mid.ticks() / 10_000) / tick_ticks).max(1);
        let grouped_bid = Price::from_ticks((best_bid.ticks() / group) * group);
        let grouped_ask = Price::from_ticks(((best_ask.ticks() + group - 1) / group) * group);
        let grouped_mid = Price::from_ticks((grouped_bid.ticks() + grouped_ask.ticks()) / 2);
        Some((grouped_mid, grouped_mid))
    }

    fn vwap_midp(&self, book: &OrderBook, depth: usize) -> Option<(Price, Price)> {
        let bid_vwap = vwap(&book.get_top_levels(Side::Buy, depth))?;
        let ask_vwap = vwap(&book.get_top_levels(Side::Sell, depth))?;
        let mid = Price::from_ticks((bid_vwap.ticks() + ask_vwap.ticks()) / 2);
        Some((mid, mid))
    }

    fn imbalance(&self, book: &OrderBook, band_bps: i64, depth: usize) -> Option<(Price, Price)> {
        let (best_bid, _) = book.best_bid();
        let (best_ask, _) = book.best_ask();
        if best_bid.is_zero() || best_ask.is_zero() {
            return None;
        }
        let mid = Price::from_ticks((best_bid.ticks() + best_ask.ticks()) / 2);
        let band = mid.ticks() * band_bps / 10_000;
        let lower = mid.ticks() - band;
        let upper = mid.ticks() + band;

        let bid_qty: i64 = book
            .get_top_levels(Side::Buy, depth)
            .into_iter()
            .filter(|(p, _)| p.ticks() >= lower)
            .map(|(_, q)| q.ticks())
            .sum();
        let ask_qty: i64 = book
            .get_top_levels(Side::Sell, depth)
            .into_iter()
            .filter(|(p, _)| p.ticks() <= upper)
            .map(|(_, q)| q.ticks())
            .sum();
        if bid_qty + ask_qty == 0 {
            return None;
        }
        let fair_ticks =
            (best_ask.ticks() * bid_qty + best_bid.ticks() * ask_qty) / (bid_qty + ask_qty);
        let fair = Price::from_ticks(fair_ticks);
        Some((fair, fair))
    }

    fn penalty(
        &mut self,
        book: &OrderBook,
        expand_multiplier: Decimal,
        shrink_multiplier: Decimal,
    ) -> Option<(Price, Price)> {
        let (best_bid, _) = book.best_bid();
        let (best_ask, _) = book.best_ask();
        if best_bid.is_zero() || best_ask.is_zero() {
            return None;
        }
        let spread = best_ask - best_bid;
        let multiplier = if spread.ticks() >= self.last_spread.ticks() {
            expand_multiplier
        } else {
            shrink_multiplier
        };
        self.last_spread = spread;

        let adjustment = (spread.to_decimal() * multiplier).max(Decimal::ZERO);
        let adjustment_price = Price::from_decimal(adjustment).unwrap_or(Price::ZERO);
        self.acc_bid_penalty = (self.acc_bid_penalty + adjustment_price).max(Price::ZERO);
        self.acc_ask_penalty = (self.acc_ask_penalty + adjustment_price).max(Price::ZERO);

        let fair_ask = best_bid + self.acc_ask_penalty;
        let fair_bid = (best_ask - self.acc_bid_penalty).max(Price::ZERO);
        Some((fair_bid, fair_ask))
    }

    fn emit_if_changed(&mut self, fair_bid: Price, fair_ask: Price) -> Option<FairValueUpdate> {
        if self.last_emitted == Some((fair_bid, fair_ask)) {
            return None;
        }
        self.last_emitted = Some((fair_bid, fair_ask));
        Some(FairValueUpdate {
            instrument_id: self.instrument_id,
            fair_bid,
            fair_ask,
        })
    }
}

fn vwap(levels: &[(Price, oms_instrument::num::Quantity)]) -> Option<Price> {
    let total_qty: i64 = levels.iter().map(|(_, q)| q.ticks()).sum();
    if total_qty == 0 {
        return None;
    }
    let weighted: i64 = levels.iter().map(|(p, q)| p.ticks() * q.ticks()).sum();
    Some(Price::from_ticks(weighted / total_qty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_book::event::{MarketDataEvent, MarketDataEventKind, PriceLevelUpdate};
    use oms_instrument::exchange::ExchangeId;
    use oms_instrument::num::Quantity;

    fn book(levels: Vec<(Side, i64, i64)>) -> OrderBook {
        let mut book = OrderBook::new(
            InstrumentId(0),
            "BTC-PERP",
            ExchangeId::Binance,
            Price::from_ticks(1),
            Quantity::from_ticks(1),
        );
        book.apply_event(&MarketDataEvent {
            sequence: 1,
            timestamp_us: 0,
            kind: MarketDataEventKind::Snapshot,
            instrument_id: InstrumentId(0),
            source_exchange: ExchangeId::Binance,
            updates: levels
                .into_iter()
                .map(|(side, price, qty)| PriceLevelUpdate { side, price_ticks: price, qty_ticks: qty })
                .collect(),
        });
        book
    }

    #[test]
    fn midp_is_the_mean_of_best_bid_and_ask() {
        let mut provider = FairValueProvider::new(InstrumentId(0), FairValueModel::Midp, Price::from_ticks(1));
        let b = book(vec![(Side::Buy, 100, 1), (Side::Sell, 200, 1)]);
        let update = provider.update_from_book(&b).unwrap();
        assert_eq!(update.fair_bid, Price::from_ticks(150));
        assert_eq!(update.fair_ask, Price::from_ticks(150));
    }

    #[test]
    fn midp_does_not_re_emit_when_value_is_unchanged() {
        let mut provider = FairValueProvider::new(InstrumentId(0), FairValueModel::Midp, Price::from_ticks(1));
        let b = book(vec![(Side::Buy, 100, 1), (Side::Sell, 200, 1)]);
        assert!(provider.update_from_book(&b).is_some());
        assert!(provider.update_from_book(&b).is_none());
    }

    #[test]
    fn opposite_best_swaps_bid_and_ask() {
        let mut provider =
            FairValueProvider::new(InstrumentId(0), FairValueModel::OppositeBest, Price::from_ticks(1));
        let b = book(vec![(Side::Buy, 100, 1), (Side::Sell, 200, 1)]);
        let update = provider.update_from_book(&b).unwrap();
        assert_eq!(update.fair_bid, Price::from_ticks(200));
        assert_eq!(update.fair_ask, Price::from_ticks(100));
    }

    #[test]
    fn vwap_midp_weighs_by_quantity() {
        let mut provider = FairValueProvider::new(
            InstrumentId(0),
            FairValueModel::VwapMidp { depth: 2 },
            Price::from_ticks(1),
        );
        let b = book(vec![
            (Side::Buy, 100, 3),
            (Side::Buy, 99, 1),
            (Side::Sell, 200, 1),
            (Side::Sell, 201, 3),
        ]);
        let update = provider.update_from_book(&b).unwrap();
        // bid vwap = (100*3 + 99*1)/4 = 99.75 -> 99 (integer tick division)
        // ask vwap = (200*1 + 201*3)/4 = 200.75 -> 200
        assert_eq!(update.fair_bid, Price::from_ticks((99 + 200) / 2));
    }

    #[test]
    fn imbalance_skews_toward_the_heavier_side() {
        let mut provider = FairValueProvider::new(
            InstrumentId(0),
            FairValueModel::OrderBookImbalance { band_bps: 50, depth: 5 },
            Price::from_ticks(1),
        );
        let b = book(vec![(Side::Buy, 10_000, 9), (Side::Sell, 10_010, 1)]);
        let update = provider.update_from_book(&b).unwrap();
        // Heavier bid (9) than ask (1) pulls fair value toward the ask side.
        assert!(update.fair_bid.ticks() > 10_000);
    }

    #[test]
    fn penalty_widens_on_spread_expansion_and_clamps_at_zero() {
        let mut provider = FairValueProvider::new(
            InstrumentId(0),
            FairValueModel::Penalty {
                expand_multiplier: Decimal::new(5, 1),
                shrink_multiplier: Decimal::new(5, 1),
            },
            Price::from_ticks(1),
        );
        let tight = book(vec![(Side::Buy, 100, 1), (Side::Sell, 101, 1)]);
        let wide = book(vec![(Side::Buy, 100, 1), (Side::Sell, 110, 1)]);

        let first = provider.update_from_book(&tight).unwrap();
        assert_eq!(first.fair_bid, Price::from_ticks(101));
        assert_eq!(first.fair_ask, Price::from_ticks(100));

        let second = provider.update_from_book(&wide).unwrap();
        assert!(second.fair_ask.ticks() > 100);
        assert!(provider.acc_ask_penalty.ticks() >= 0);
        assert!(provider.acc_bid_penalty.ticks() >= 0);
    }
}
