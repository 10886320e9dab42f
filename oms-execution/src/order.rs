use crate::error::ExecutionError;
use crate::fill::Fill;
use crate::gateway::{
    CancelOrderRequest, Gateway, NewOrderRequest, OrderModificationResult, ReplaceOrderRequest,
};
use crate::ids::{ClientOrderId, ClientOrderIdGenerator, ExchangeOrderId};
use crate::report::{OrderStatus, OrderStatusReport};
use crate::router::OrderRouter;
use oms_instrument::{instrument::InstrumentId, num::Price, num::Quantity, side::Side};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static CLIENT_ORDER_IDS: ClientOrderIdGenerator = ClientOrderIdGenerator::new();

const RPC_TIMEOUT: Duration = Duration::from_secs(5);

pub type FillHandler = Box<dyn Fn(&Fill) + Send + Sync>;
pub type StatusHandler = Box<dyn Fn(&OrderStatusReport) + Send + Sync>;

/// One working order: a single client order id's worth of exchange state,
/// mutated only through `submit`/`replace`/`cancel` and the report/fill
/// callbacks the router drives (spec.md §4).
pub struct Order {
    client_order_id: ClientOrderId,
    instrument_id: InstrumentId,
    side: Side,
    post_only: bool,
    price: RwLock<Price>,
    quantity: RwLock<Quantity>,
    leaves_quantity: RwLock<Quantity>,
    status: RwLock<OrderStatus>,
    exchange_order_id: RwLock<Option<ExchangeOrderId>>,
    router: Weak<OrderRouter>,
    gateway: Arc<dyn Gateway>,
    fill_handler: Option<FillHandler>,
    status_handler: Option<StatusHandler>,
    deregistered: AtomicBool,
    /// Cancellation token for whichever RPC is currently in flight, replaced
    /// fresh at the start of every `submit`/`replace`/`cancel` call so that
    /// firing it never poisons a later retry (spec.md §5: "every RPC accepts
    /// a cancellation token").
    in_flight_rpc: RwLock<CancellationToken>,
}

impl std::fmt::Debug for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Order")
            .field("client_order_id", &self.client_order_id)
            .field("instrument_id", &self.instrument_id)
            .field("side", &self.side)
            .field("status", &self.status())
            .field("price", &self.price())
            .field("quantity", &self.quantity())
            .finish()
    }
}

impl Order {
    pub fn client_order_id(&self) -> ClientOrderId {
        self.client_order_id
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn status(&self) -> OrderStatus {
        *self.status.read()
    }

    pub fn price(&self) -> Price {
        *self.price.read()
    }

    pub fn quantity(&self) -> Quantity {
        *self.quantity.read()
    }

    pub fn leaves_quantity(&self) -> Quantity {
        *self.leaves_quantity.read()
    }

    pub fn exchange_order_id(&self) -> Option<ExchangeOrderId> {
        self.exchange_order_id.read().clone()
    }

    /// Cancels whichever RPC is currently in flight for this order, if any.
    /// A no-op if nothing is in flight or it already resolved. Never touches
    /// order state: the exchange, not a locally-abandoned call, is the
    /// authority on what happened (spec.md §5).
    pub fn abort_in_flight_rpc(&self) {
        self.in_flight_rpc.read().cancel();
    }

    /// Races `fut` against `RPC_TIMEOUT` and this order's current
    /// cancellation token, installing a fresh token first so a prior
    /// `abort_in_flight_rpc` call can never carry over into a later retry.
    async fn run_rpc<F, T>(&self, fut: F) -> Result<T, ExecutionError>
    where
        F: Future<Output = Result<T, ExecutionError>>,
    {
        let token = CancellationToken::new();
        *self.in_flight_rpc.write() = token.clone();
        tokio::select! {
            _ = token.cancelled() => Err(ExecutionError::Cancelled),
            result = tokio::time::timeout(RPC_TIMEOUT, fut) => match result {
                Err(_) => Err(ExecutionError::Timeout),
                Ok(inner) => inner,
            },
        }
    }

    /// Overrides the working price before the order is first submitted, used
    /// by [`crate::algo::AlgoOrder`] to set an entry price derived from the
    /// book at submit time. Valid only from `Created`.
    pub fn set_price_before_submit(&self, price: Price) -> Result<(), ExecutionError> {
        let mut status = self.status.write();
        if *status != OrderStatus::Created {
            return Err(ExecutionError::StateViolation(format!(
                "set_price_before_submit called from {status:?}"
            )));
        }
        drop(status);
        *self.price.write() = price;
        Ok(())
    }

    /// Sends the order to the gateway. Valid only from `Created`; any other
    /// starting status is a [`ExecutionError::StateViolation`] with no state
    /// change (spec.md §4.4 invariant 2).
    pub async fn submit(&self) -> Result<(), ExecutionError> {
        {
            let mut status = self.status.write();
            if *status != OrderStatus::Created {
                return Err(ExecutionError::StateViolation(format!(
                    "submit called from {status:?}"
                )));
            }
            *status = OrderStatus::Pending;
        }

        let request = NewOrderRequest {
            client_order_id: self.client_order_id,
            instrument_id: self.instrument_id,
            side: self.side,
            price: self.price(),
            quantity: self.quantity(),
            post_only: self.post_only,
        };

        let result = self.run_rpc(self.gateway.submit_order(request)).await;
        match result {
            Err(err) => Err(err),
            Ok(placement) => {
                if placement.accepted {
                    *self.exchange_order_id.write() = placement.exchange_order_id.clone();
                    *self.leaves_quantity.write() = self.quantity();
                    *self.status.write() = OrderStatus::New;
                    if let (Some(router), Some(exchange_order_id)) =
                        (self.router.upgrade(), placement.exchange_order_id)
                    {
                        router.map_exchange_id_to_client_id(exchange_order_id, self.client_order_id);
                    }
                    Ok(())
                } else {
                    *self.status.write() = OrderStatus::Rejected;
                    self.deregister();
                    Err(ExecutionError::TransientRpc(
                        placement.reason.unwrap_or_else(|| "rejected".into()),
                    ))
                }
            }
        }
    }

    /// Re-prices a live order at its current quantity. Valid only while
    /// `is_active()` (spec.md §4.4 rule 2: market data is ignored while
    /// awaiting resolution, so a second replace cannot race this one).
    ///
    /// The public contract is price-only (spec.md §4.4 line 109): sizing up
    /// needs a brand-new order and sizing down needs cancel-then-new, both of
    /// which require a second `client_order_id` this single `Order` can't
    /// synthesize, so any `new_quantity` other than the current one is
    /// rejected rather than silently forwarded.
    pub async fn replace(&self, new_price: Price, new_quantity: Quantity) -> Result<(), ExecutionError> {
        if new_quantity != self.quantity() {
            return Err(ExecutionError::StateViolation(
                "replace is price-only; quantity changes require a new order".into(),
            ));
        }

        let exchange_order_id = self.require_exchange_order_id()?;
        {
            let mut status = self.status.write();
            if !status.is_active() {
                return Err(ExecutionError::StateViolation(format!(
                    "replace called from {status:?}"
                )));
            }
            *status = OrderStatus::ReplaceRequest;
        }

        let result = if self.gateway.supports_order_replacement() {
            let request = ReplaceOrderRequest {
                client_order_id: self.client_order_id,
                exchange_order_id,
                new_price,
                new_quantity,
            };
            self.run_rpc(self.gateway.replace_order(request)).await
        } else {
            self.run_rpc(self.emulate_replace_via_cancel_and_new(exchange_order_id, new_price, new_quantity))
                .await
        };

        match result {
            Err(err) => Err(err),
            Ok(modification) => {
                if modification.accepted {
                    *self.price.write() = new_price;
                    *self.quantity.write() = new_quantity;
                    *self.leaves_quantity.write() = new_quantity;
                    *self.status.write() = OrderStatus::New;
                    Ok(())
                } else {
                    *self.status.write() = OrderStatus::New;
                    Err(ExecutionError::TransientRpc(
                        modification.reason.unwrap_or_else(|| "rejected".into()),
                    ))
                }
            }
        }
    }

    /// Emulates a replace as cancel-then-new for gateways that don't report
    /// [`Gateway::supports_order_replacement`]. Reuses this order's own
    /// `client_order_id`: the exchange sees a cancel followed by a fresh
    /// submit under the same id, and the router's exchange-id mapping is
    /// repointed at whatever id the new submit is acknowledged under.
    async fn emulate_replace_via_cancel_and_new(
        &self,
        exchange_order_id: ExchangeOrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> Result<OrderModificationResult, ExecutionError> {
        let cancel = self
            .gateway
            .cancel_order(CancelOrderRequest {
                client_order_id: self.client_order_id,
                exchange_order_id,
            })
            .await?;
        if !cancel.accepted {
            return Ok(cancel);
        }

        let placement = self
            .gateway
            .submit_order(NewOrderRequest {
                client_order_id: self.client_order_id,
                instrument_id: self.instrument_id,
                side: self.side,
                price: new_price,
                quantity: new_quantity,
                post_only: self.post_only,
            })
            .await?;

        if placement.accepted {
            *self.exchange_order_id.write() = placement.exchange_order_id.clone();
            if let (Some(router), Some(exchange_order_id)) =
                (self.router.upgrade(), placement.exchange_order_id)
            {
                router.map_exchange_id_to_client_id(exchange_order_id, self.client_order_id);
            }
        }

        Ok(OrderModificationResult {
            accepted: placement.accepted,
            reason: placement.reason,
        })
    }

    /// Requests cancellation. Idempotent while already `CancelRequest`: a
    /// caller may retry indefinitely on [`ExecutionError::Timeout`] or
    /// [`ExecutionError::Cancelled`] without violating the FSM (spec.md §7).
    pub async fn cancel(&self) -> Result<(), ExecutionError> {
        let exchange_order_id = self.require_exchange_order_id()?;
        let previous_status = {
            let mut status = self.status.write();
            if status.is_terminal() {
                return Err(ExecutionError::StateViolation(format!(
                    "cancel called from {status:?}"
                )));
            }
            let previous = *status;
            *status = OrderStatus::CancelRequest;
            previous
        };

        let request = CancelOrderRequest {
            client_order_id: self.client_order_id,
            exchange_order_id,
        };

        let result = self.run_rpc(self.gateway.cancel_order(request)).await;
        match result {
            Err(err) => Err(err),
            Ok(modification) => {
                if modification.accepted {
                    *self.status.write() = OrderStatus::Cancelled;
                    self.deregister();
                    Ok(())
                } else {
                    *self.status.write() = previous_status;
                    Err(ExecutionError::TransientRpc(
                        modification.reason.unwrap_or_else(|| "rejected".into()),
                    ))
                }
            }
        }
    }

    /// Applied by [`OrderRouter::route_report`] when a report for this order
    /// arrives out of band (e.g. an exchange-initiated cancel).
    pub fn on_report(&self, report: &OrderStatusReport) {
        *self.status.write() = report.status;
        *self.leaves_quantity.write() = report.leaves_quantity;
        if report.exchange_order_id.is_some() {
            *self.exchange_order_id.write() = report.exchange_order_id.clone();
        }
        if let Some(handler) = &self.status_handler {
            handler(report);
        }
        if report.status.is_terminal() {
            self.deregister();
        }
    }

    pub fn on_fill(&self, fill: &Fill) {
        {
            let mut leaves = self.leaves_quantity.write();
            *leaves = Quantity::from_ticks((leaves.ticks() - fill.quantity.ticks()).max(0));
            if leaves.is_zero() {
                *self.status.write() = OrderStatus::Filled;
            } else {
                *self.status.write() = OrderStatus::PartiallyFilled;
            }
        }
        if let Some(handler) = &self.fill_handler {
            handler(fill);
        }
        if self.status() == OrderStatus::Filled {
            self.deregister();
        }
    }

    fn require_exchange_order_id(&self) -> Result<ExchangeOrderId, ExecutionError> {
        self.exchange_order_id
            .read()
            .clone()
            .ok_or_else(|| ExecutionError::StateViolation("no exchange order id assigned yet".into()))
    }

    fn deregister(&self) {
        if self.deregistered.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(router) = self.router.upgrade() {
            router.deregister_order(self.client_order_id);
        }
    }
}

/// Builds an [`Order`], wiring up handlers before the order is visible to the
/// router, then registers it immediately (spec.md §4: "registers with the
/// router before its first submit call").
pub struct OrderBuilder {
    instrument_id: InstrumentId,
    side: Side,
    price: Price,
    quantity: Quantity,
    post_only: bool,
    fill_handler: Option<FillHandler>,
    status_handler: Option<StatusHandler>,
}

impl OrderBuilder {
    pub fn new(instrument_id: InstrumentId, side: Side) -> Self {
        Self {
            instrument_id,
            side,
            price: Price::ZERO,
            quantity: Quantity::ZERO,
            post_only: false,
            fill_handler: None,
            status_handler: None,
        }
    }

    pub fn price(mut self, price: Price) -> Self {
        self.price = price;
        self
    }

    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn post_only(mut self, post_only: bool) -> Self {
        self.post_only = post_only;
        self
    }

    pub fn on_fill(mut self, handler: FillHandler) -> Self {
        self.fill_handler = Some(handler);
        self
    }

    pub fn on_status(mut self, handler: StatusHandler) -> Self {
        self.status_handler = Some(handler);
        self
    }

    pub fn build(self, router: Arc<OrderRouter>, gateway: Arc<dyn Gateway>) -> Arc<Order> {
        let order = Arc::new(Order {
            client_order_id: CLIENT_ORDER_IDS.next(),
            instrument_id: self.instrument_id,
            side: self.side,
            post_only: self.post_only,
            price: RwLock::new(self.price),
            quantity: RwLock::new(self.quantity),
            leaves_quantity: RwLock::new(Quantity::ZERO),
            status: RwLock::new(OrderStatus::Created),
            exchange_order_id: RwLock::new(None),
            router: Arc::downgrade(&router),
            gateway,
            fill_handler: self.fill_handler,
            status_handler: self.status_handler,
            deregistered: AtomicBool::new(false),
            in_flight_rpc: RwLock::new(CancellationToken::new()),
        });
        router.register_order(order.clone());
        order
    }
}
