//! Quoting instance (spec.md §4.5): drives a bid/ask pair of [`AlgoOrder`]s
//! off a [`FairValueProvider`]'s updates.

use crate::fair_value::FairValueUpdate;
use oms_book::OrderBook;
use oms_execution::algo::{AlgoOrder, RepricingStrategy};
use oms_execution::gateway::Gateway;
use oms_execution::ids::ClientOrderId;
use oms_execution::order::OrderBuilder;
use oms_execution::router::OrderRouter;
use oms_instrument::instrument::{Instrument, InstrumentId};
use oms_instrument::num::{Price, Quantity};
use oms_instrument::side::Side;
use oms_risk::check::RiskContext;
use oms_risk::engine::RiskEngine;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq)]
pub struct QuotingParameters {
    pub symbol: SmolStr,
    pub bid_spread_bps: Decimal,
    pub ask_spread_bps: Decimal,
    pub skew_bps: Decimal,
    pub size: Quantity,
    pub post_only: bool,
    pub depth: usize,
    pub quoter_type: RepricingStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotePair {
    pub instrument_id: InstrumentId,
    pub bid_price: Price,
    pub ask_price: Price,
    pub size: Quantity,
    pub timestamp_us: i64,
}

const QUOTE_EVENT_CAPACITY: usize = 1024;

struct Legs {
    bid: Option<Arc<AlgoOrder>>,
    ask: Option<Arc<AlgoOrder>>,
}

/// One instrument's market-making quote, recomputed on every fair-value
/// update and materialized as (at most) one resting [`AlgoOrder`] per side.
pub struct QuotingInstance {
    instrument: Instrument,
    parameters: RwLock<QuotingParameters>,
    legs: RwLock<Legs>,
    risk: Arc<RiskEngine>,
    position: RwLock<Quantity>,
    router: Arc<OrderRouter>,
    gateway: Arc<dyn Gateway>,
    quote_events: broadcast::Sender<QuotePair>,
}

impl std::fmt::Debug for QuotingInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotingInstance")
            .field("instrument_id", &self.instrument.instrument_id)
            .field("parameters", &self.parameters.read())
            .finish()
    }
}

impl QuotingInstance {
    pub fn new(
        instrument: Instrument,
        parameters: QuotingParameters,
        risk: Arc<RiskEngine>,
        router: Arc<OrderRouter>,
        gateway: Arc<dyn Gateway>,
    ) -> Arc<Self> {
        let (quote_events, _) = broadcast::channel(QUOTE_EVENT_CAPACITY);
        Arc::new(Self {
            instrument,
            parameters: RwLock::new(parameters),
            legs: RwLock::new(Legs { bid: None, ask: None }),
            risk,
            position: RwLock::new(Quantity::ZERO),
            router,
            gateway,
            quote_events,
        })
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument.instrument_id
    }

    pub fn subscribe_quotes(&self) -> broadcast::Receiver<QuotePair> {
        self.quote_events.subscribe()
    }

    pub fn update_parameters(&self, parameters: QuotingParameters) {
        *self.parameters.write() = parameters;
    }

    /// Updates the position risk checks are evaluated against, fed by
    /// settled fills for this instrument.
    pub fn update_position(&self, position: Quantity) {
        *self.position.write() = position;
    }

    pub fn bid_client_order_id(&self) -> Option<ClientOrderId> {
        self.legs.read().bid.as_ref().map(|a| a.order().client_order_id())
    }

    pub fn ask_client_order_id(&self) -> Option<ClientOrderId> {
        self.legs.read().ask.as_ref().map(|a| a.order().client_order_id())
    }

    /// Recomputes bid/ask targets for a fair-value update and submits or
    /// replaces each leg as needed (spec.md §4.5).
    pub async fn on_fair_value_update(self: &Arc<Self>, update: FairValueUpdate, book: &OrderBook, timestamp_us: i64) {
        if update.instrument_id != self.instrument.instrument_id {
            return;
        }
        let parameters = self.parameters.read().clone();

        let fair_mid = Price::from_ticks((update.fair_bid.ticks() + update.fair_ask.ticks()) / 2);
        let skew_adjustment = price_bps(fair_mid, parameters.skew_bps);

        let raw_bid = update.fair_bid - price_bps(update.fair_bid, parameters.bid_spread_bps) + skew_adjustment;
        let raw_ask = update.fair_ask + price_bps(update.fair_ask, parameters.ask_spread_bps) + skew_adjustment;

        let bid_price = raw_bid.floor_to(self.instrument.tick_size);
        let ask_price = raw_ask.ceil_to(self.instrument.tick_size);
        let size = parameters.size.floor_to(self.instrument.lot_size);

        if size.ticks() < self.instrument.min_order_size.ticks() {
            return;
        }

        self.quote_or_replace(Side::Buy, bid_price, size, &parameters, book).await;
        self.quote_or_replace(Side::Sell, ask_price, size, &parameters, book).await;

        let _ = self.quote_events.send(QuotePair {
            instrument_id: self.instrument.instrument_id,
            bid_price,
            ask_price,
            size,
            timestamp_us,
        });
    }

    async fn quote_or_replace(
        self: &Arc<Self>,
        side: Side,
        target_price: Price,
        size: Quantity,
        parameters: &QuotingParameters,
        book: &OrderBook,
    ) {
        let existing = {
            let legs = self.legs.read();
            match side {
                Side::Buy => legs.bid.clone(),
                Side::Sell => legs.ask.clone(),
            }
        };

        if let Some(algo) = existing {
            if !algo.order().status().is_active() {
                self.clear_leg(side);
            } else {
                let delta = (target_price - algo.order().price()).ticks().abs();
                if delta >= self.instrument.tick_size.ticks() {
                    let quantity = algo.order().quantity();
                    let _ = algo.order().replace(target_price, quantity).await;
                }
                return;
            }
        }

        let context = RiskContext {
            client_order_id: ClientOrderId(0),
            instrument_id: self.instrument.instrument_id,
            side,
            price: target_price,
            quantity: size,
            current_position: *self.position.read(),
            open_order_notional: self.open_order_notional(),
            new_order_notional: self.instrument.notional(target_price, size),
        };
        if let Err(breaches) = self.risk.evaluate(&context) {
            tracing::warn!(?side, ?breaches, "quote leg skipped by risk check");
            return;
        }

        let order = OrderBuilder::new(self.instrument.instrument_id, side)
            .quantity(size)
            .post_only(parameters.post_only)
            .build(self.router.clone(), self.gateway.clone());
        let algo = AlgoOrder::new(order, parameters.quoter_type, self.instrument.tick_size);
        if algo.submit(book).await.is_ok() {
            let mut legs = self.legs.write();
            match side {
                Side::Buy => legs.bid = Some(algo),
                Side::Sell => legs.ask = Some(algo),
            }
        }
    }

    /// Notional of every currently-resting leg, summed in the instrument's
    /// denomination currency.
    fn open_order_notional(&self) -> oms_instrument::currency::CurrencyAmount {
        let legs = self.legs.read();
        let mut total = self.instrument.notional(Price::ZERO, Quantity::ZERO);
        for algo in [&legs.bid, &legs.ask].into_iter().flatten() {
            if algo.order().status().is_active() {
                let notional = self
                    .instrument
                    .notional(algo.order().price(), algo.order().leaves_quantity());
                total.amount += notional.amount;
            }
        }
        total
    }

    fn clear_leg(&self, side: Side) {
        let mut legs = self.legs.write();
        match side {
            Side::Buy => legs.bid = None,
            Side::Sell => legs.ask = None,
        }
    }
}

fn price_bps(price: Price, bps: Decimal) -> Price {
    let adjustment = price.to_decimal() * bps / Decimal::from(10_000);
    Price::from_decimal(adjustment).unwrap_or(Price::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_book::event::{MarketDataEvent, MarketDataEventKind, PriceLevelUpdate};
    use oms_execution::gateway::mock::MockGateway;
    use oms_instrument::currency::Currency;
    use oms_instrument::exchange::ExchangeId;
    use oms_instrument::instrument::InstrumentKind;
    use rust_decimal_macros::dec;

    fn test_instrument(tick_size: Price, lot_size: Quantity, min_order_size: Quantity) -> Instrument {
        Instrument {
            instrument_id: InstrumentId(0),
            symbol: SmolStr::new("BTC-PERP"),
            source_exchange: ExchangeId::Binance,
            base_currency: Currency::new("BTC"),
            quote_currency: Currency::new("USDT"),
            tick_size,
            lot_size,
            min_order_size,
            kind: InstrumentKind::Linear {
                contract_multiplier: Quantity::from_decimal(dec!(1)).unwrap(),
            },
        }
    }

    fn book_with_bbo(bid: i64, ask: i64) -> OrderBook {
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
            updates: vec![
                PriceLevelUpdate { side: Side::Buy, price_ticks: bid, qty_ticks: 10 },
                PriceLevelUpdate { side: Side::Sell, price_ticks: ask, qty_ticks: 10 },
            ],
        });
        book
    }

    fn params() -> QuotingParameters {
        QuotingParameters {
            symbol: SmolStr::new("BTC-PERP"),
            bid_spread_bps: dec!(10),
            ask_spread_bps: dec!(10),
            skew_bps: Decimal::ZERO,
            size: Quantity::from_decimal(dec!(1)).unwrap(),
            post_only: true,
            depth: 5,
            quoter_type: RepricingStrategy::FirstFollow,
        }
    }

    #[tokio::test]
    async fn first_update_submits_both_legs() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let instrument = test_instrument(Price::from_ticks(1), Quantity::from_ticks(1), Quantity::from_ticks(1));
        let instance = QuotingInstance::new(
            instrument,
            params(),
            Arc::new(oms_risk::engine::RiskEngine::new()),
            router,
            gateway,
        );
        let book = book_with_bbo(1_000_000, 1_001_000);
        let update = FairValueUpdate {
            instrument_id: InstrumentId(0),
            fair_bid: Price::from_ticks(1_000_500),
            fair_ask: Price::from_ticks(1_000_500),
        };
        instance.on_fair_value_update(update, &book, 1).await;

        assert!(instance.bid_client_order_id().is_some());
        assert!(instance.ask_client_order_id().is_some());
    }

    #[tokio::test]
    async fn quote_below_min_order_size_is_skipped() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let mut p = params();
        p.size = Quantity::from_decimal(dec!(0.1)).unwrap();
        let instrument = test_instrument(
            Price::from_ticks(1),
            Quantity::from_ticks(1),
            Quantity::from_decimal(dec!(1)).unwrap(),
        );
        let instance = QuotingInstance::new(
            instrument,
            p,
            Arc::new(oms_risk::engine::RiskEngine::new()),
            router,
            gateway,
        );
        let book = book_with_bbo(1_000_000, 1_001_000);
        let update = FairValueUpdate {
            instrument_id: InstrumentId(0),
            fair_bid: Price::from_ticks(1_000_500),
            fair_ask: Price::from_ticks(1_000_500),
        };
        instance.on_fair_value_update(update, &book, 1).await;

        assert!(instance.bid_client_order_id().is_none());
    }
}
