//! Top-level wiring: one [`InstrumentEngine`] per subscribed instrument,
//! threading market data through a [`FairValueProvider`] into a
//! [`QuotingInstance`], with an optional [`Hedger`] kept in sync with the
//! same book.
//!
//! This is glue, not a new algorithm: every piece it wires already exists in
//! `oms-book`/`oms-execution`/`oms-risk`/`oms-strategy`. It exists so a
//! production `main` has a single type to construct and feed market-data
//! events into, instead of re-deriving this wiring at the call site.

use oms_book::book::OrderBook;
use oms_execution::gateway::Gateway;
use oms_execution::router::OrderRouter;
use oms_instrument::instrument::{Instrument, InstrumentId};
use oms_risk::engine::RiskEngine;
use oms_strategy::fair_value::FairValueProvider;
use oms_strategy::hedge::Hedger;
use oms_strategy::quote::QuotingInstance;
use parking_lot::Mutex;
use std::sync::Arc;

/// One instrument's worth of live wiring: the book it reads from, the fair
/// value model driving its quotes, the quoting instance itself, and the
/// shared risk engine every leg is checked against before it's submitted.
///
/// `book` and `fair_value` are behind a `Mutex` rather than owned outright
/// because `Arc<InstrumentEngine>` is shared with the spawned tasks that
/// drive algo-order repricing; a single `MarketDataDistributor` subscriber
/// per instrument id is still the only writer (spec.md §4.1), so contention
/// is never real, only the borrow-checker's.
pub struct InstrumentEngine {
    pub instrument: Instrument,
    book: Mutex<OrderBook>,
    fair_value: Mutex<FairValueProvider>,
    pub quoting: Arc<QuotingInstance>,
    pub risk: Arc<RiskEngine>,
    pub hedger: Option<Arc<Hedger>>,
}

impl std::fmt::Debug for InstrumentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentEngine")
            .field("instrument_id", &self.instrument.instrument_id)
            .field("symbol", &self.instrument.symbol)
            .finish()
    }
}

impl InstrumentEngine {
    pub fn new(
        instrument: Instrument,
        fair_value: FairValueProvider,
        quoting: Arc<QuotingInstance>,
        risk: Arc<RiskEngine>,
        hedger: Option<Arc<Hedger>>,
    ) -> Self {
        let book = OrderBook::new(
            instrument.instrument_id,
            instrument.symbol.clone(),
            instrument.source_exchange.clone(),
            instrument.tick_size,
            instrument.lot_size,
        );
        Self {
            instrument,
            book: Mutex::new(book),
            fair_value: Mutex::new(fair_value),
            quoting,
            risk,
            hedger,
        }
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument.instrument_id
    }

    /// Applies a market-data event to this instrument's book and, if it
    /// moved the fair value by at least one tick, recomputes and resubmits
    /// quotes (spec.md §4.1, §4.6, §4.5 wired end to end).
    pub async fn on_market_data_event(self: &Arc<Self>, event: &oms_book::event::MarketDataEvent, timestamp_us: i64) {
        let applied = self.book.lock().apply_event(event).applied();
        if !applied {
            return;
        }

        let update = {
            let book = self.book.lock();
            self.fair_value.lock().update_from_book(&book)
        };
        if let Some(update) = update {
            let book = self.book.lock();
            self.quoting.clone().on_fair_value_update(update, &book, timestamp_us).await;
        }

        if let Some(hedger) = &self.hedger {
            if hedger.instrument_id() == self.instrument_id() {
                let book = self.book.lock();
                hedger.on_hedge_book_update(&book);
            }
        }
    }
}

/// Builds an [`InstrumentEngine`] from its constituent parts. Kept separate
/// from [`InstrumentEngine::new`] so tests can construct a bare engine
/// without pulling in a full config.
pub struct InstrumentEngineBuilder {
    instrument: Instrument,
    fair_value: FairValueProvider,
    router: Arc<OrderRouter>,
    gateway: Arc<dyn Gateway>,
    risk: Arc<RiskEngine>,
    hedger: Option<Arc<Hedger>>,
}

impl InstrumentEngineBuilder {
    pub fn new(
        instrument: Instrument,
        fair_value: FairValueProvider,
        router: Arc<OrderRouter>,
        gateway: Arc<dyn Gateway>,
        risk: Arc<RiskEngine>,
    ) -> Self {
        Self {
            instrument,
            fair_value,
            router,
            gateway,
            risk,
            hedger: None,
        }
    }

    pub fn with_hedger(mut self, hedger: Arc<Hedger>) -> Self {
        self.hedger = Some(hedger);
        self
    }

    pub fn build(self, parameters: oms_strategy::quote::QuotingParameters) -> Arc<InstrumentEngine> {
        let quoting = oms_strategy::quote::QuotingInstance::new(
            self.instrument.clone(),
            parameters,
            self.risk.clone(),
            self.router,
            self.gateway,
        );
        Arc::new(InstrumentEngine::new(
            self.instrument,
            self.fair_value,
            quoting,
            self.risk,
            self.hedger,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_book::event::{MarketDataEvent, MarketDataEventKind, PriceLevelUpdate};
    use oms_execution::gateway::mock::MockGateway;
    use oms_instrument::currency::Currency;
    use oms_instrument::exchange::ExchangeId;
    use oms_instrument::num::{Price, Quantity};
    use oms_instrument::side::Side;
    use oms_risk::engine::RiskEngine;
    use oms_strategy::fair_value::{FairValueModel, FairValueProvider};
    use oms_strategy::quote::QuotingParameters;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;

    fn test_instrument() -> Instrument {
        Instrument {
            instrument_id: InstrumentId(0),
            symbol: SmolStr::new("BTC-PERP"),
            source_exchange: ExchangeId::Binance,
            base_currency: Currency::new("BTC"),
            quote_currency: Currency::new("USDT"),
            tick_size: Price::from_ticks(1),
            lot_size: Quantity::from_decimal(dec!(0.01)).unwrap(),
            min_order_size: Quantity::from_decimal(dec!(0.01)).unwrap(),
            kind: oms_instrument::instrument::InstrumentKind::Linear {
                contract_multiplier: Quantity::from_decimal(dec!(1)).unwrap(),
            },
        }
    }

    #[tokio::test]
    async fn market_data_event_drives_quotes_end_to_end() {
        let instrument = test_instrument();
        let router = OrderRouter::new();
        let gateway: Arc<dyn Gateway> = Arc::new(MockGateway::new());
        let risk = Arc::new(RiskEngine::new());
        let fair_value = FairValueProvider::new(instrument.instrument_id, FairValueModel::Midp, instrument.tick_size);

        let engine = InstrumentEngineBuilder::new(instrument.clone(), fair_value, router, gateway, risk).build(
            QuotingParameters {
                symbol: instrument.symbol.clone(),
                bid_spread_bps: dec!(10),
                ask_spread_bps: dec!(10),
                skew_bps: Decimal::ZERO,
                size: Quantity::from_decimal(dec!(1)).unwrap(),
                post_only: true,
                depth: 1,
                quoter_type: oms_execution::algo::RepricingStrategy::FirstFollow,
            },
        );

        engine
            .on_market_data_event(
                &MarketDataEvent {
                    sequence: 1,
                    timestamp_us: 0,
                    kind: MarketDataEventKind::Snapshot,
                    instrument_id: instrument.instrument_id,
                    source_exchange: ExchangeId::Binance,
                    updates: vec![
                        PriceLevelUpdate { side: Side::Buy, price_ticks: 1_000_000, qty_ticks: 10_000 },
                        PriceLevelUpdate { side: Side::Sell, price_ticks: 1_001_000, qty_ticks: 10_000 },
                    ],
                },
                1,
            )
            .await;

        assert!(engine.quoting.bid_client_order_id().is_some());
        assert!(engine.quoting.ask_client_order_id().is_some());
    }
}
