#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Execution
//!
//! Order lifecycle state machine, self-repricing algo orders, order routing
//! and net position accounting (spec.md §3, §4.4, §7).

pub mod algo;
pub mod error;
pub mod fill;
pub mod gateway;
pub mod ids;
pub mod order;
pub mod position;
pub mod report;
pub mod router;

pub use algo::{AlgoOrder, RepricingStrategy};
pub use error::ExecutionError;
pub use fill::Fill;
pub use gateway::{
    BulkCancelOrdersRequest, CancelOrderRequest, Gateway, NewOrderRequest, OrderModificationResult,
    OrderPlacementResult, ReplaceOrderRequest,
};
pub use ids::{ClientOrderId, ClientOrderIdGenerator, ExchangeOrderId, ExecId};
pub use order::{Order, OrderBuilder};
pub use position::Position;
pub use report::{OrderStatus, OrderStatusReport};
pub use router::{OrderRouter, RouterEvent};
