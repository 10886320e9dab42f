//! External interface contracts (spec.md §6): traits only, with just enough
//! body to compile and test against an in-memory mock. Concrete wire clients
//! (feed WebSocket, control-protocol transport, SQLite persistence) are out
//! of scope (spec.md §1/§2 Non-goals) — these traits are the seam a
//! production binary implements against.

use async_trait::async_trait;
use chrono::NaiveDate;
use oms_book::event::MarketDataEvent;
use oms_execution::fill::Fill;
use oms_execution::report::OrderStatusReport;
use oms_instrument::exchange::ExchangeId;
use oms_instrument::instrument::InstrumentId;
use oms_strategy::quote::{QuotePair, QuotingParameters};
use smol_str::SmolStr;

/// Connection lifecycle / data events a [`FeedAdapter`] pushes onto the
/// market-data disruptor (spec.md §6). Adapters must honor
/// [`MarketDataEvent`]'s schema bit-for-bit.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    ConnectionStateChanged {
        exchange: ExchangeId,
        is_connected: bool,
        reason: Option<String>,
    },
    MarketDataReceived(MarketDataEvent),
    Error(String),
}

/// What the core consumes from a market-data source. A concrete adapter owns
/// the wire protocol (WS reconnection, resubscription, sequence tracking
/// below the OrderBook) and is out of scope here.
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    async fn connect(&self) -> Result<(), String>;
    async fn disconnect(&self) -> Result<(), String>;
    async fn subscribe(
        &self,
        exchange: ExchangeId,
        product_type: SmolStr,
        symbols: Vec<SmolStr>,
    ) -> Result<(), String>;
    fn events(&self) -> tokio::sync::broadcast::Receiver<FeedEvent>;
}

/// Fill persistence: async append, lookup by date or instrument+date. No
/// ordering guarantee across instruments (spec.md §6).
#[async_trait]
pub trait FillStore: Send + Sync {
    async fn append(&self, fill: Fill) -> Result<(), String>;
    async fn fills_on_date(&self, date: NaiveDate) -> Result<Vec<Fill>, String>;
    async fn fills_for_instrument_on_date(
        &self,
        instrument_id: InstrumentId,
        date: NaiveDate,
    ) -> Result<Vec<Fill>, String>;
}

/// Inbound commands on the OMS control protocol (spec.md §6: WebSocket,
/// line-delimited JSON). The correlation id round-trips into `Ack`/`Error`
/// so a client can match replies to requests.
#[derive(Debug, Clone)]
pub enum ControlCommand {
    UpdateParameters {
        correlation_id: SmolStr,
        instrument_id: InstrumentId,
        parameters: QuotingParameters,
    },
    RetireInstance {
        correlation_id: SmolStr,
        instrument_id: InstrumentId,
    },
    GetInstanceStatuses {
        correlation_id: SmolStr,
    },
    GetActiveOrders {
        correlation_id: SmolStr,
    },
    GetFills {
        correlation_id: SmolStr,
    },
}

/// Outbound events on the control protocol.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    Ack {
        correlation_id: SmolStr,
        success: bool,
        message: Option<String>,
    },
    InstanceStatus {
        oms_identifier: SmolStr,
        instrument_id: InstrumentId,
        is_active: bool,
        parameters: QuotingParameters,
    },
    ActiveOrdersList {
        correlation_id: SmolStr,
        orders: Vec<OrderStatusReport>,
    },
    FillsList {
        correlation_id: SmolStr,
        fills: Vec<Fill>,
    },
    QuotePairUpdate(QuotePair),
    Error {
        correlation_id: Option<SmolStr>,
        message: String,
    },
}

/// One control-protocol session. "Only one client at a time... later
/// connections rejected with HTTP 409" (spec.md §6) is a transport-layer
/// concern for the concrete WebSocket server that owns the listener; this
/// trait models the command/event contract that transport carries.
#[async_trait]
pub trait ControlProtocol: Send + Sync {
    async fn handle_command(&self, command: ControlCommand) -> ControlEvent;
}
