use crate::ids::{ClientOrderId, ExchangeOrderId, ExecId};
use oms_instrument::{instrument::InstrumentId, num::Price, num::Quantity, side::Side};
use serde::{Deserialize, Serialize};

/// The order lifecycle FSM (spec.md §4.4).
///
/// ```text
/// Created -> PendingNew -> New -> PartiallyFilled* -> Filled
///                                -> Cancelled
///                                -> Rejected
///                                -> ReplaceRequest -> New
///                                -> CancelRequest  -> Cancelled
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Created,
    Pending,
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    ReplaceRequest,
    CancelRequest,
}

impl OrderStatus {
    /// Terminal statuses never transition further (spec.md §3, §8 invariant 2).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// `New` or `PartiallyFilled`: the order is live on the book and an
    /// [`crate::algo::AlgoOrder`] re-prices against it (spec.md §4.4 rule 1).
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    /// While a replace/cancel is in flight, market data is ignored until a
    /// resolving report arrives (spec.md §4.4 rule 2).
    pub fn is_awaiting_resolution(self) -> bool {
        matches!(self, OrderStatus::ReplaceRequest | OrderStatus::CancelRequest)
    }
}

/// An execution report from the gateway, as delivered by [`crate::router::OrderRouter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub client_order_id: Option<ClientOrderId>,
    pub exchange_order_id: Option<ExchangeOrderId>,
    pub exec_id: Option<ExecId>,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub status: OrderStatus,
    pub price: Price,
    pub quantity: Quantity,
    pub leaves_quantity: Quantity,
    pub timestamp_us: i64,
}
