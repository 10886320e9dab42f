use crate::ids::{ExecId, ExchangeOrderId};
use oms_instrument::{instrument::InstrumentId, num::Price, num::Quantity, side::Side};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A single fill, uniquely identified by `(exchange_order_id, exec_id)`
/// (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub instrument_id: InstrumentId,
    pub book_name: SmolStr,
    pub seq: u64,
    pub exchange_order_id: ExchangeOrderId,
    pub exec_id: ExecId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp_us: i64,
}

impl Fill {
    pub fn key(&self) -> (ExchangeOrderId, ExecId) {
        (self.exchange_order_id.clone(), self.exec_id.clone())
    }
}
