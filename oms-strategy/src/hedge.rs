//! The cross-instrument hedger (spec.md §4.7): a continuous pending-exposure
//! flattener. Every fill on the quoting instrument creates a signed "hedge
//! need" on the hedge instrument; this accumulates in `net_pending_hedge_quantity`
//! and is worked off in slices no larger than `parameters.slice_size`.
//!
//! Locking discipline: `pending_lock` then `state_lock`, always in that order,
//! never held across an RPC (spec.md §4.7). `check_and_start_hedge` takes both,
//! decides the next slice and applies intention-based accounting (decrementing
//! pending *before* the child order is submitted), then releases both locks
//! before awaiting the gateway.

use oms_book::{BookView, OrderBook};
use oms_execution::algo::{AlgoOrder, RepricingStrategy};
use oms_execution::fill::Fill;
use oms_execution::gateway::Gateway;
use oms_execution::ids::ClientOrderId;
use oms_execution::order::OrderBuilder;
use oms_execution::report::{OrderStatus, OrderStatusReport};
use oms_execution::router::{OrderRouter, RouterEvent};
use oms_instrument::currency::{Currency, CurrencyAmount};
use oms_instrument::instrument::Instrument;
use oms_instrument::num::{Price, Quantity};
use oms_instrument::side::Side;
use oms_risk::check::RiskContext;
use oms_risk::engine::RiskEngine;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Converts between currencies for hedge-need accounting. Conversions are
/// restricted to BTC↔USDT (spec.md §4.7); anything else is `None` and the
/// caller suppresses the accumulation rather than guessing a rate.
pub trait FxService: Send + Sync {
    fn convert(&self, amount: &CurrencyAmount, target: &Currency) -> Option<CurrencyAmount>;
}

/// A reference FX service backed by one cached book mid (e.g. BTCUSDT).
#[derive(Debug)]
pub struct ReferenceBookFx {
    btc: Currency,
    usdt: Currency,
    mid_usdt_per_btc: parking_lot::RwLock<Price>,
}

impl ReferenceBookFx {
    pub fn new(initial_mid_usdt_per_btc: Price) -> Self {
        Self {
            btc: Currency::new("BTC"),
            usdt: Currency::new("USDT"),
            mid_usdt_per_btc: parking_lot::RwLock::new(initial_mid_usdt_per_btc),
        }
    }

    pub fn update_mid(&self, book: &OrderBook) {
        let mid = book.get_mid_price();
        if !mid.is_zero() {
            *self.mid_usdt_per_btc.write() = mid;
        }
    }
}

impl FxService for ReferenceBookFx {
    fn convert(&self, amount: &CurrencyAmount, target: &Currency) -> Option<CurrencyAmount> {
        if amount.currency == *target {
            return Some(amount.clone());
        }
        let mid = self.mid_usdt_per_btc.read().to_decimal();
        if mid.is_zero() {
            return None;
        }
        if amount.currency == self.btc && *target == self.usdt {
            return Some(CurrencyAmount::new(target.clone(), amount.amount * mid));
        }
        if amount.currency == self.usdt && *target == self.btc {
            return Some(CurrencyAmount::new(target.clone(), amount.amount / mid));
        }
        None
    }
}

#[derive(Debug, Clone)]
pub struct HedgerParameters {
    pub slice_size: Quantity,
    pub min_order_size: Quantity,
    pub quoter_type: RepricingStrategy,
}

/// A minimal, cached `BookView` snapshot of the hedge instrument, updated by
/// [`Hedger::on_hedge_book_update`] and used to price the child order without
/// holding a reference to the live book across an RPC.
#[derive(Debug, Clone, Copy)]
struct CachedBook {
    instrument_id: oms_instrument::instrument::InstrumentId,
    best_bid: (Price, Quantity),
    best_ask: (Price, Quantity),
}

impl BookView for CachedBook {
    fn instrument_id(&self) -> oms_instrument::instrument::InstrumentId {
        self.instrument_id
    }
    fn best_bid(&self) -> (Price, Quantity) {
        self.best_bid
    }
    fn best_ask(&self) -> (Price, Quantity) {
        self.best_ask
    }
}

pub struct Hedger {
    quoting_instrument: Instrument,
    hedge_instrument: Instrument,
    parameters: HedgerParameters,
    pending_lock: Mutex<Quantity>,
    state_lock: Mutex<Option<Arc<AlgoOrder>>>,
    cached_book: Mutex<CachedBook>,
    is_active: AtomicBool,
    fx: Arc<dyn FxService>,
    risk: Arc<RiskEngine>,
    position: RwLock<Quantity>,
    router: Arc<OrderRouter>,
    gateway: Arc<dyn Gateway>,
}

impl std::fmt::Debug for Hedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hedger")
            .field("quoting_instrument", &self.quoting_instrument.symbol)
            .field("hedge_instrument", &self.hedge_instrument.symbol)
            .field("pending", &*self.pending_lock.lock())
            .field("is_active", &self.is_active.load(Ordering::Acquire))
            .finish()
    }
}

const SUPPORTED_CURRENCIES: [&str; 2] = ["BTC", "USDT"];

impl Hedger {
    /// Checks activation preconditions once at construction and logs a
    /// warning (rather than failing) if they're violated, per spec.md §4.7.
    pub fn new(
        quoting_instrument: Instrument,
        hedge_instrument: Instrument,
        parameters: HedgerParameters,
        fx: Arc<dyn FxService>,
        risk: Arc<RiskEngine>,
        router: Arc<OrderRouter>,
        gateway: Arc<dyn Gateway>,
    ) -> Arc<Self> {
        let quoting_denom = quoting_instrument.denomination_currency();
        let hedge_denom = hedge_instrument.denomination_currency();
        let currencies_supported = SUPPORTED_CURRENCIES.contains(&quoting_denom.as_str())
            && SUPPORTED_CURRENCIES.contains(&hedge_denom.as_str());
        let base_currencies_match = quoting_instrument.base_currency == hedge_instrument.base_currency;
        let preconditions_met = currencies_supported && base_currencies_match;
        if !preconditions_met {
            tracing::warn!(
                quoting = %quoting_instrument.symbol,
                hedge = %hedge_instrument.symbol,
                "hedger activation preconditions violated, starting inactive"
            );
        }

        let hedge_instrument_id = hedge_instrument.instrument_id;
        Arc::new(Self {
            quoting_instrument,
            hedge_instrument,
            parameters,
            pending_lock: Mutex::new(Quantity::ZERO),
            state_lock: Mutex::new(None),
            cached_book: Mutex::new(CachedBook {
                instrument_id: hedge_instrument_id,
                best_bid: (Price::ZERO, Quantity::ZERO),
                best_ask: (Price::ZERO, Quantity::ZERO),
            }),
            is_active: AtomicBool::new(preconditions_met),
            fx,
            risk,
            position: RwLock::new(Quantity::ZERO),
            router,
            gateway,
        })
    }

    pub fn pending(&self) -> Quantity {
        *self.pending_lock.lock()
    }

    /// Updates the position risk checks are evaluated against, fed by
    /// settled fills on the hedge instrument.
    pub fn update_position(&self, position: Quantity) {
        *self.position.write() = position;
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }

    /// Auto-deactivate/reactivate on hedge-exchange connectivity changes.
    /// A no-op if activation preconditions were never met.
    pub fn on_connectivity_changed(&self, connected: bool) {
        let quoting_denom = self.quoting_instrument.denomination_currency();
        let hedge_denom = self.hedge_instrument.denomination_currency();
        let currencies_supported = SUPPORTED_CURRENCIES.contains(&quoting_denom.as_str())
            && SUPPORTED_CURRENCIES.contains(&hedge_denom.as_str());
        let base_currencies_match = self.quoting_instrument.base_currency == self.hedge_instrument.base_currency;
        if currencies_supported && base_currencies_match {
            self.is_active.store(connected, Ordering::Release);
        }
    }

    pub fn on_hedge_book_update(self: &Arc<Self>, book: &OrderBook) {
        *self.cached_book.lock() = CachedBook {
            instrument_id: self.hedge_instrument.instrument_id,
            best_bid: book.best_bid(),
            best_ask: book.best_ask(),
        };
        let hedger = Arc::clone(self);
        tokio::spawn(async move { hedger.check_and_start_hedge().await });
    }

    /// Records a fill on the quoting leg, converts it into a hedge-leg
    /// quantity via the FX service, and schedules a slice check (spec.md
    /// §4.7 input 1).
    pub async fn on_quoting_fill(self: &Arc<Self>, fill: &Fill) {
        if !self.is_active() {
            return;
        }
        let notional = self.quoting_instrument.notional(fill.price, fill.quantity);
        let need = CurrencyAmount::new(notional.currency, -(fill.side.sign()) * notional.amount);

        let hedge_denom = self.hedge_instrument.denomination_currency();
        let Some(converted) = self.fx.convert(&need, &hedge_denom) else {
            tracing::warn!(
                from = %need.currency,
                to = %hedge_denom,
                "hedger cannot convert quoting fill into hedge currency, suppressing accumulation"
            );
            return;
        };

        let unit_value = self.hedge_instrument.unit_value(self.cached_mid());
        if unit_value.amount.is_zero() {
            return;
        }
        let hedge_qty_decimal = converted.amount / unit_value.amount;
        let Ok(hedge_qty) = Quantity::from_decimal(hedge_qty_decimal) else {
            return;
        };

        {
            let mut pending = self.pending_lock.lock();
            *pending = *pending + hedge_qty;
        }

        self.check_and_start_hedge().await;
    }

    /// Logging only: the quantity was already removed from `pending` when the
    /// child order was submitted (spec.md §4.7 input 3).
    pub fn on_hedging_fill(&self, fill: &Fill) {
        tracing::debug!(
            exchange_order_id = %fill.exchange_order_id,
            exec_id = %fill.exec_id,
            "hedge leg fill recorded"
        );
    }

    /// Handles a status report for the active hedge child order: on a
    /// terminal report, gives back unfilled quantity to `pending` and
    /// re-enters the slice loop (spec.md §4.7 input 4).
    pub async fn on_order_status_changed(self: &Arc<Self>, report: &OrderStatusReport) {
        if !report.status.is_terminal() {
            return;
        }
        let is_active_order = {
            let active = self.state_lock.lock();
            active
                .as_ref()
                .map(|a| a.order().client_order_id() == report.client_order_id.unwrap_or(ClientOrderId(0)))
                .unwrap_or(false)
        };
        if !is_active_order {
            return;
        }

        let side_sign = report.side.sign();
        {
            let mut pending = self.pending_lock.lock();
            *pending = *pending + Quantity::from_ticks(side_sign * report.leaves_quantity.ticks());
        }
        *self.state_lock.lock() = None;

        self.check_and_start_hedge().await;
    }

    /// Dispatches a router event relevant to this hedger's active child
    /// order. Convenience wrapper around [`Self::on_order_status_changed`]
    /// for callers draining an [`OrderRouter`] broadcast receiver.
    pub async fn handle_router_event(self: &Arc<Self>, event: &RouterEvent) {
        match event {
            RouterEvent::OrderStatusChanged(report) => self.on_order_status_changed(report).await,
            RouterEvent::OrderFilled(fill) if fill.instrument_id == self.hedge_instrument.instrument_id => {
                self.on_hedging_fill(fill)
            }
            RouterEvent::OrderFilled(_) => {}
        }
    }

    fn cached_mid(&self) -> Price {
        let book = self.cached_book.lock();
        if book.best_bid.0.is_zero() || book.best_ask.0.is_zero() {
            return Price::ZERO;
        }
        Price::from_ticks((book.best_bid.0.ticks() + book.best_ask.0.ticks()) / 2)
    }

    /// The slice loop (spec.md §4.7 `check_and_start_hedge`).
    async fn check_and_start_hedge(self: &Arc<Self>) {
        if !self.is_active() {
            return;
        }

        let submission = {
            let mut pending = self.pending_lock.lock();
            let mut active = self.state_lock.lock();

            if active.is_some() {
                return;
            }
            if pending.ticks().abs() < self.parameters.min_order_size.ticks() {
                return;
            }
            let book = *self.cached_book.lock();
            if book.best_bid.0.is_zero() || book.best_ask.0.is_zero() {
                return;
            }

            let side = if pending.ticks() > 0 { Side::Buy } else { Side::Sell };
            let magnitude = pending.ticks().abs().min(self.parameters.slice_size.ticks());
            let slice = Quantity::from_ticks(magnitude).floor_to(self.hedge_instrument.lot_size);
            if slice.ticks() < self.parameters.min_order_size.ticks() {
                return;
            }

            let slice_price = {
                let mid_bid = book.best_bid.0;
                let mid_ask = book.best_ask.0;
                if side == Side::Buy { mid_ask } else { mid_bid }
            };
            let context = RiskContext {
                client_order_id: ClientOrderId(0),
                instrument_id: self.hedge_instrument.instrument_id,
                side,
                price: slice_price,
                quantity: slice,
                current_position: *self.position.read(),
                open_order_notional: self.hedge_instrument.notional(Price::ZERO, Quantity::ZERO),
                new_order_notional: self.hedge_instrument.notional(slice_price, slice),
            };
            if let Err(breaches) = self.risk.evaluate(&context) {
                tracing::warn!(?side, ?breaches, "hedge slice skipped by risk check");
                return;
            }

            // Intention-based accounting: remove the slice before the RPC.
            *pending = Quantity::from_ticks(pending.ticks() - side.sign() * slice.ticks());

            let order = OrderBuilder::new(self.hedge_instrument.instrument_id, side)
                .quantity(slice)
                .build(self.router.clone(), self.gateway.clone());
            let algo = AlgoOrder::new(order, self.parameters.quoter_type, self.hedge_instrument.tick_size);
            *active = Some(algo.clone());

            (algo, side, slice, book)
        };

        let (algo, side, slice, book) = submission;
        if algo.submit(&book).await.is_err() {
            // Synchronous rejection: roll back the intention.
            let mut pending = self.pending_lock.lock();
            *pending = *pending + Quantity::from_ticks(side.sign() * slice.ticks());
            *self.state_lock.lock() = None;
        }
    }
}
