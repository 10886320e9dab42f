use crate::fill::Fill;
use crate::ids::{ClientOrderId, ExchangeOrderId};
use crate::order::Order;
use crate::report::OrderStatusReport;
use oms_integration::collection::FnvHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events every subscriber of an [`OrderRouter`] can observe, regardless of
/// which order produced them (spec.md §4.4: the strategy layer listens for
/// fills and terminal status changes without holding a reference to the
/// individual order).
#[derive(Debug, Clone)]
pub enum RouterEvent {
    OrderStatusChanged(OrderStatusReport),
    OrderFilled(Fill),
}

const EVENT_CHANNEL_CAPACITY: usize = 4096;

struct RouterState {
    by_client_id: FnvHashMap<ClientOrderId, Arc<Order>>,
    exchange_to_client: FnvHashMap<ExchangeOrderId, ClientOrderId>,
}

/// Central directory mapping client order ids (and, once assigned, exchange
/// order ids) to live [`Order`] handles, and the broadcast point for
/// status/fill events (spec.md §4: "Order creation... registers with the
/// router before its first submit call").
pub struct OrderRouter {
    state: RwLock<RouterState>,
    events: broadcast::Sender<RouterEvent>,
}

impl OrderRouter {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            state: RwLock::new(RouterState {
                by_client_id: FnvHashMap::default(),
                exchange_to_client: FnvHashMap::default(),
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    /// Registers an order before its first submit call, per spec.md §4.
    pub fn register_order(&self, order: Arc<Order>) {
        let client_order_id = order.client_order_id();
        self.state.write().by_client_id.insert(client_order_id, order);
    }

    pub fn deregister_order(&self, client_order_id: ClientOrderId) {
        let mut state = self.state.write();
        if let Some(order) = state.by_client_id.remove(&client_order_id) {
            if let Some(exchange_order_id) = order.exchange_order_id() {
                state.exchange_to_client.remove(&exchange_order_id);
            }
        }
    }

    /// Binds an exchange order id to a client order id, once the gateway
    /// acks the new order. Idempotent: rebinding the same pair is a no-op.
    pub fn map_exchange_id_to_client_id(
        &self,
        exchange_order_id: ExchangeOrderId,
        client_order_id: ClientOrderId,
    ) {
        self.state
            .write()
            .exchange_to_client
            .insert(exchange_order_id, client_order_id);
    }

    pub fn order(&self, client_order_id: ClientOrderId) -> Option<Arc<Order>> {
        self.state.read().by_client_id.get(&client_order_id).cloned()
    }

    pub fn order_by_exchange_id(&self, exchange_order_id: &ExchangeOrderId) -> Option<Arc<Order>> {
        let state = self.state.read();
        let client_order_id = *state.exchange_to_client.get(exchange_order_id)?;
        state.by_client_id.get(&client_order_id).cloned()
    }

    /// Routes a report to the order it belongs to (by client order id) and
    /// broadcasts the status change to every subscriber.
    pub fn route_report(&self, report: OrderStatusReport) {
        if let Some(client_order_id) = report.client_order_id {
            if let Some(order) = self.order(client_order_id) {
                order.on_report(&report);
            }
        }
        let _ = self.events.send(RouterEvent::OrderStatusChanged(report));
    }

    /// As [`Self::route_report`], but looked up by exchange order id — used
    /// when a gateway's execution report carries no client order id (the
    /// common case for fills).
    pub fn route_report_by_exchange_id(&self, exchange_order_id: &ExchangeOrderId, report: OrderStatusReport) {
        if let Some(order) = self.order_by_exchange_id(exchange_order_id) {
            order.on_report(&report);
        }
        let _ = self.events.send(RouterEvent::OrderStatusChanged(report));
    }

    pub fn route_fill(&self, fill: Fill) {
        if let Some(order) = self.order_by_exchange_id(&fill.exchange_order_id) {
            order.on_fill(&fill);
        }
        let _ = self.events.send(RouterEvent::OrderFilled(fill));
    }
}

impl std::fmt::Debug for OrderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("OrderRouter")
            .field("orders", &state.by_client_id.len())
            .finish()
    }
}
