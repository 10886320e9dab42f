//! Self-repricing orders: an [`AlgoOrder`] owns one [`Order`] and keeps it
//! pinned to a moving target price as the book updates (spec.md §4.4).
//!
//! - **OppositeFirst** (aggressive/taker-price): pegs to the opposite side's
//!   best — a buy's target is `best_ask`, a sell's is `best_bid` — replacing
//!   whenever the opposite touch moves away from the order's current price,
//!   in either direction. Entry price at submit time is the opposite-side
//!   best; submitting into an empty book is a state violation.
//! - **FirstFollow** (maker, one tick inside the leader): a buy moves to
//!   `best_bid + 1 tick` only when `best_bid > current_price`; a sell
//!   symmetrically to `best_ask - 1 tick`. An order that already *is* the best
//!   never moves (no self-penny). Entry price at submit time is the same-side
//!   best.
//!
//! Both variants obey the same two guards: reprice only while the order
//! `is_active()` (New/PartiallyFilled — terminal statuses unsubscribe), and
//! never compute against a book while a replace/cancel is already in flight
//! (`is_awaiting_resolution()`), since a second concurrent replace would race
//! the first.

use crate::error::ExecutionError;
use crate::ids::ClientOrderId;
use crate::order::Order;
use crate::report::OrderStatus;
use oms_book::BookView;
use oms_instrument::num::Price;
use oms_instrument::{instrument::InstrumentId, side::Side};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepricingStrategy {
    OppositeFirst,
    FirstFollow,
}

/// The subscriber key this order's market-data callback is registered under
/// on [`oms_book::MarketDataDistributor`], guaranteed unique per order.
pub fn subscription_key(client_order_id: ClientOrderId) -> String {
    format!("AlgoOrder_{client_order_id}")
}

pub struct AlgoOrder {
    order: Arc<Order>,
    strategy: RepricingStrategy,
    tick_size: Price,
    repricing_in_flight: AtomicBool,
}

impl std::fmt::Debug for AlgoOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgoOrder")
            .field("order", &self.order)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl AlgoOrder {
    pub fn new(order: Arc<Order>, strategy: RepricingStrategy, tick_size: Price) -> Arc<Self> {
        Arc::new(Self {
            order,
            strategy,
            tick_size,
            repricing_in_flight: AtomicBool::new(false),
        })
    }

    pub fn order(&self) -> &Arc<Order> {
        &self.order
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.order.instrument_id()
    }

    fn entry_price(&self, book: &dyn BookView) -> Option<Price> {
        let (best_bid, _) = book.best_bid();
        let (best_ask, _) = book.best_ask();
        if best_bid.is_zero() || best_ask.is_zero() {
            return None;
        }
        Some(match (self.strategy, self.order.side()) {
            (RepricingStrategy::OppositeFirst, Side::Buy) => best_ask,
            (RepricingStrategy::OppositeFirst, Side::Sell) => best_bid,
            (RepricingStrategy::FirstFollow, Side::Buy) => best_bid,
            (RepricingStrategy::FirstFollow, Side::Sell) => best_ask,
        })
    }

    /// Sets the entry price from the book and submits. Rejects with
    /// [`ExecutionError::StateViolation`] if the relevant side of the book is
    /// empty (spec.md §4.4: "reject submit if book empty").
    pub async fn submit(self: &Arc<Self>, book: &dyn BookView) -> Result<(), ExecutionError> {
        let entry_price = self.entry_price(book).ok_or_else(|| {
            ExecutionError::StateViolation("cannot submit algo order against an empty book".into())
        })?;
        self.order.set_price_before_submit(entry_price)?;
        self.order.submit().await
    }

    /// `None` if the order shouldn't move right now; `Some(target)` if it
    /// should replace to `target`.
    fn target_price(&self, book: &dyn BookView) -> Option<Price> {
        let (best_bid, _) = book.best_bid();
        let (best_ask, _) = book.best_ask();
        if best_bid.is_zero() || best_ask.is_zero() {
            return None;
        }
        let current = self.order.price();
        match (self.strategy, self.order.side()) {
            (RepricingStrategy::OppositeFirst, Side::Buy) if best_ask != current => Some(best_ask),
            (RepricingStrategy::OppositeFirst, Side::Sell) if best_bid != current => Some(best_bid),
            (RepricingStrategy::FirstFollow, Side::Buy) if best_bid > current => {
                Some(best_bid + self.tick_size)
            }
            (RepricingStrategy::FirstFollow, Side::Sell) if best_ask < current => {
                Some(best_ask - self.tick_size)
            }
            _ => None,
        }
    }

    /// Called by the distributor's subscriber callback for this order's
    /// instrument on every dispatched book update. A no-op unless the
    /// underlying order is active and the book implies a new target price;
    /// spawns the replace so the distributor thread is never blocked on an
    /// RPC (spec.md §4.1: the distributor must stay wait-free; §5: callbacks
    /// must not suspend).
    pub fn on_market_data_updated(self: &Arc<Self>, book: &dyn BookView) {
        let status = self.order.status();
        if !status.is_active() {
            return;
        }
        let Some(target) = self.target_price(book) else {
            return;
        };
        if self
            .repricing_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let algo = Arc::clone(self);
        let quantity = algo.order.leaves_quantity();
        tokio::spawn(async move {
            let result = algo.order.replace(target, quantity).await;
            if let Err(error) = result {
                tracing::warn!(
                    client_order_id = %algo.order.client_order_id(),
                    %error,
                    "algo order replace rejected, will re-evaluate on next market tick"
                );
            }
            algo.repricing_in_flight.store(false, Ordering::Release);
        });
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.order.status(),
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use crate::order::OrderBuilder;
    use crate::router::OrderRouter;
    use oms_book::event::{MarketDataEvent, MarketDataEventKind, PriceLevelUpdate};
    use oms_book::OrderBook;
    use oms_instrument::exchange::ExchangeId;
    use oms_instrument::num::Quantity;
    use rust_decimal_macros::dec;

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

    fn new_algo_order(
        router: &Arc<OrderRouter>,
        gateway: &Arc<MockGateway>,
        side: Side,
        strategy: RepricingStrategy,
    ) -> Arc<AlgoOrder> {
        let order = OrderBuilder::new(InstrumentId(0), side)
            .quantity(Quantity::from_decimal(dec!(1)).unwrap())
            .build(router.clone(), gateway.clone());
        AlgoOrder::new(order, strategy, Price::from_ticks(1))
    }

    #[tokio::test]
    async fn opposite_first_buy_enters_at_best_ask() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let algo = new_algo_order(&router, &gateway, Side::Buy, RepricingStrategy::OppositeFirst);
        let book = book_with_bbo(1_000_000, 1_001_000);
        algo.submit(&book).await.unwrap();
        assert_eq!(algo.order().price(), Price::from_ticks(1_001_000));
    }

    #[tokio::test]
    async fn opposite_first_submit_rejected_against_empty_book() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let algo = new_algo_order(&router, &gateway, Side::Buy, RepricingStrategy::OppositeFirst);
        let book = OrderBook::new(
            InstrumentId(0),
            "BTC-PERP",
            ExchangeId::Binance,
            Price::from_ticks(1),
            Quantity::from_ticks(1),
        );
        let err = algo.submit(&book).await.unwrap_err();
        assert!(matches!(err, ExecutionError::StateViolation(_)));
    }

    #[tokio::test]
    async fn opposite_first_buy_moves_down_when_ask_improves() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let algo = new_algo_order(&router, &gateway, Side::Buy, RepricingStrategy::OppositeFirst);
        algo.submit(&book_with_bbo(1_000_000, 1_001_000)).await.unwrap();

        let cheaper_ask = book_with_bbo(1_000_000, 1_000_500);
        algo.on_market_data_updated(&cheaper_ask);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(algo.order().price(), Price::from_ticks(1_000_500));
    }

    #[tokio::test]
    async fn opposite_first_buy_chases_ask_upward_when_it_worsens() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let algo = new_algo_order(&router, &gateway, Side::Buy, RepricingStrategy::OppositeFirst);
        algo.submit(&book_with_bbo(95, 100)).await.unwrap();
        assert_eq!(algo.order().price(), Price::from_ticks(100));

        // Force the order back to a stale price (as if submitted earlier at 90)
        // and confirm a single worsening ask tick triggers exactly one replace
        // to the new best ask, per the chasing-ask boundary scenario.
        algo.order().on_report(&crate::report::OrderStatusReport {
            client_order_id: Some(algo.order().client_order_id()),
            exchange_order_id: algo.order().exchange_order_id(),
            exec_id: None,
            instrument_id: InstrumentId(0),
            side: Side::Buy,
            status: OrderStatus::New,
            price: Price::from_ticks(90),
            quantity: algo.order().quantity(),
            leaves_quantity: algo.order().leaves_quantity(),
            timestamp_us: 1,
        });

        let worse_ask = book_with_bbo(95, 100);
        algo.on_market_data_updated(&worse_ask);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(algo.order().price(), Price::from_ticks(100));

        // A second identical update must not re-replace.
        algo.on_market_data_updated(&worse_ask);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(algo.order().price(), Price::from_ticks(100));
    }

    #[tokio::test]
    async fn first_follow_buy_does_not_self_penny() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let algo = new_algo_order(&router, &gateway, Side::Buy, RepricingStrategy::FirstFollow);
        let book = book_with_bbo(1_000_000, 1_001_000);
        algo.submit(&book).await.unwrap();
        assert_eq!(algo.order().price(), Price::from_ticks(1_000_000));

        // Order IS the best bid: a tick with the same best_bid must not move it.
        algo.on_market_data_updated(&book);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(algo.order().price(), Price::from_ticks(1_000_000));
    }

    #[tokio::test]
    async fn first_follow_buy_joins_one_tick_inside_improved_best_bid() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let algo = new_algo_order(&router, &gateway, Side::Buy, RepricingStrategy::FirstFollow);
        algo.submit(&book_with_bbo(1_000_000, 1_001_000)).await.unwrap();

        let better_bid = book_with_bbo(1_000_400, 1_001_000);
        algo.on_market_data_updated(&better_bid);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(algo.order().price(), Price::from_ticks(1_000_401));
    }

    #[tokio::test]
    async fn no_reprice_when_order_is_awaiting_resolution() {
        let router = OrderRouter::new();
        let gateway = Arc::new(MockGateway::new());
        let algo = new_algo_order(&router, &gateway, Side::Buy, RepricingStrategy::FirstFollow);
        algo.submit(&book_with_bbo(1_000_000, 1_001_000)).await.unwrap();

        // Simulate an in-flight replace by marking the order as awaiting resolution.
        algo.order().on_report(&crate::report::OrderStatusReport {
            client_order_id: Some(algo.order().client_order_id()),
            exchange_order_id: algo.order().exchange_order_id(),
            exec_id: None,
            instrument_id: InstrumentId(0),
            side: Side::Buy,
            status: OrderStatus::ReplaceRequest,
            price: algo.order().price(),
            quantity: algo.order().quantity(),
            leaves_quantity: algo.order().leaves_quantity(),
            timestamp_us: 1,
        });

        let better_bid = book_with_bbo(1_000_400, 1_001_000);
        algo.on_market_data_updated(&better_bid);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        // Status is not active, so the update was ignored outright.
        assert_eq!(algo.order().price(), Price::from_ticks(1_000_000));
    }
}
