use crate::error::ExecutionError;
use crate::ids::{ClientOrderId, ExchangeOrderId};
use async_trait::async_trait;
use oms_instrument::{instrument::InstrumentId, num::Price, num::Quantity, side::Side};

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderRequest {
    pub client_order_id: ClientOrderId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub post_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceOrderRequest {
    pub client_order_id: ClientOrderId,
    pub exchange_order_id: ExchangeOrderId,
    pub new_price: Price,
    pub new_quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelOrderRequest {
    pub client_order_id: ClientOrderId,
    pub exchange_order_id: ExchangeOrderId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkCancelOrdersRequest {
    pub instrument_id: Option<InstrumentId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlacementResult {
    pub accepted: bool,
    pub exchange_order_id: Option<ExchangeOrderId>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderModificationResult {
    pub accepted: bool,
    pub reason: Option<String>,
}

/// The exchange-facing half of order management. Everything an [`crate::order::Order`]
/// touches goes through here; a concrete implementation owns the wire protocol
/// (REST/WebSocket signing, rate limiting, reconnection) and is out of scope here.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn submit_order(
        &self,
        request: NewOrderRequest,
    ) -> Result<OrderPlacementResult, ExecutionError>;

    async fn replace_order(
        &self,
        request: ReplaceOrderRequest,
    ) -> Result<OrderModificationResult, ExecutionError>;

    async fn cancel_order(
        &self,
        request: CancelOrderRequest,
    ) -> Result<OrderModificationResult, ExecutionError>;

    /// One result per order the bulk-cancel touched (spec.md §6).
    async fn bulk_cancel_orders(
        &self,
        request: BulkCancelOrdersRequest,
    ) -> Result<Vec<OrderModificationResult>, ExecutionError>;

    /// If false, [`crate::order::Order::replace`] emulates a replace as
    /// cancel-then-new instead of sending `ReplaceOrderRequest` (spec.md §6).
    fn supports_order_replacement(&self) -> bool;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone)]
    pub enum Call {
        Submit(NewOrderRequest),
        Replace(ReplaceOrderRequest),
        Cancel(CancelOrderRequest),
        BulkCancel(BulkCancelOrdersRequest),
    }

    /// A deterministic, in-memory [`Gateway`] for tests: every request is
    /// accepted and echoed back with a sequentially-assigned exchange order id
    /// unless `reject_next` has been armed.
    #[derive(Debug, Default)]
    pub struct MockGateway {
        calls: Mutex<Vec<Call>>,
        next_exchange_id: Mutex<u64>,
        reject_next: Mutex<bool>,
        delay: Mutex<Option<std::time::Duration>>,
        supports_replacement: Mutex<bool>,
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_exchange_id: Mutex::new(1),
                reject_next: Mutex::new(false),
                delay: Mutex::new(None),
                supports_replacement: Mutex::new(true),
            }
        }

        pub fn arm_reject_next(&self) {
            *self.reject_next.lock() = true;
        }

        /// Makes every subsequent call sleep for `delay` before responding,
        /// for tests that need to race a timeout or cancellation against an
        /// in-flight RPC.
        pub fn arm_delay(&self, delay: std::time::Duration) {
            *self.delay.lock() = Some(delay);
        }

        /// Makes [`Gateway::supports_order_replacement`] report `false`, for
        /// tests exercising the cancel+new emulation path.
        pub fn arm_unsupported_replacement(&self) {
            *self.supports_replacement.lock() = false;
        }

        async fn apply_delay(&self) {
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn take_rejection(&self) -> bool {
            let mut guard = self.reject_next.lock();
            std::mem::replace(&mut *guard, false)
        }

        fn next_id(&self) -> ExchangeOrderId {
            let mut guard = self.next_exchange_id.lock();
            let id = *guard;
            *guard += 1;
            ExchangeOrderId(smol_str::SmolStr::new(format!("EX{id}")))
        }
    }

    #[async_trait]
    impl Gateway for MockGateway {
        async fn submit_order(
            &self,
            request: NewOrderRequest,
        ) -> Result<OrderPlacementResult, ExecutionError> {
            self.calls.lock().push(Call::Submit(request));
            self.apply_delay().await;
            if self.take_rejection() {
                return Ok(OrderPlacementResult {
                    accepted: false,
                    exchange_order_id: None,
                    reason: Some("rejected by mock".into()),
                });
            }
            Ok(OrderPlacementResult {
                accepted: true,
                exchange_order_id: Some(self.next_id()),
                reason: None,
            })
        }

        async fn replace_order(
            &self,
            request: ReplaceOrderRequest,
        ) -> Result<OrderModificationResult, ExecutionError> {
            self.calls.lock().push(Call::Replace(request));
            self.apply_delay().await;
            if self.take_rejection() {
                return Ok(OrderModificationResult {
                    accepted: false,
                    reason: Some("rejected by mock".into()),
                });
            }
            Ok(OrderModificationResult {
                accepted: true,
                reason: None,
            })
        }

        async fn cancel_order(
            &self,
            request: CancelOrderRequest,
        ) -> Result<OrderModificationResult, ExecutionError> {
            self.calls.lock().push(Call::Cancel(request));
            self.apply_delay().await;
            Ok(OrderModificationResult {
                accepted: true,
                reason: None,
            })
        }

        async fn bulk_cancel_orders(
            &self,
            request: BulkCancelOrdersRequest,
        ) -> Result<Vec<OrderModificationResult>, ExecutionError> {
            self.calls.lock().push(Call::BulkCancel(request));
            // The mock doesn't track resting orders, so it reports one
            // acknowledgement for the bulk-cancel itself rather than one per
            // order actually resting.
            Ok(vec![OrderModificationResult {
                accepted: true,
                reason: None,
            }])
        }

        fn supports_order_replacement(&self) -> bool {
            *self.supports_replacement.lock()
        }
    }
}
