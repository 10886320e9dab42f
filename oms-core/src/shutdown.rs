//! Graceful and best-effort shutdown (spec.md §7 `Fatal`: "best-effort
//! shutdown (cancel all open orders for configured symbols via bulk-cancel)
//! and exit non-zero").

use oms_execution::gateway::{BulkCancelOrdersRequest, Gateway};
use oms_instrument::instrument::InstrumentId;
use std::future::Future;
use std::sync::Arc;

/// A component that can shut down immediately, without awaiting anything.
pub trait SyncShutdown {
    type Result;
    fn shutdown(&mut self) -> Self::Result;
}

/// A component whose shutdown requires async work (flushing a channel,
/// awaiting an in-flight RPC).
pub trait AsyncShutdown {
    type Result;
    fn shutdown(&mut self) -> impl Future<Output = Self::Result>;
}

/// A shutdown signal, sendable through an event stream alongside
/// market-data/execution events to trigger a coordinated stop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Shutdown;

/// Issues one bulk-cancel per configured instrument against every gateway.
/// Best-effort: a gateway that errors is logged and skipped rather than
/// aborting the rest of the shutdown (spec.md §7: the process is already on
/// its way out, this is cleanup, not a transaction).
pub async fn shutdown_all_orders(gateways: &[Arc<dyn Gateway>], instrument_ids: &[InstrumentId]) {
    for gateway in gateways {
        for &instrument_id in instrument_ids {
            let request = BulkCancelOrdersRequest {
                instrument_id: Some(instrument_id),
            };
            match gateway.bulk_cancel_orders(request).await {
                Err(error) => tracing::error!(%error, ?instrument_id, "bulk-cancel during shutdown failed"),
                Ok(results) => {
                    for result in results.iter().filter(|r| !r.accepted) {
                        tracing::warn!(?instrument_id, reason = ?result.reason, "order left unresolved by shutdown bulk-cancel");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_execution::gateway::mock::MockGateway;

    #[tokio::test]
    async fn shutdown_issues_one_bulk_cancel_per_instrument_per_gateway() {
        let mock = Arc::new(MockGateway::new());
        let gateway: Arc<dyn Gateway> = mock.clone();
        shutdown_all_orders(&[gateway], &[InstrumentId(0), InstrumentId(1)]).await;
        assert_eq!(mock.calls().len(), 2);
    }
}
