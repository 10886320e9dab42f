use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique-in-process client order id. Generated locally, never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(pub u64);

impl Display for ClientOrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic generator of unique [`ClientOrderId`]s for a process.
#[derive(Debug, Default)]
pub struct ClientOrderIdGenerator(AtomicU64);

impl ClientOrderIdGenerator {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> ClientOrderId {
        ClientOrderId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Exchange-assigned order id. Late-bound: absent until the gateway's first ack.
/// Once assigned it never changes (spec.md §4.4 invariant).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExchangeOrderId(pub SmolStr);

impl Display for ExchangeOrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Exchange-assigned execution id, uniquely identifying one fill together with
/// the [`ExchangeOrderId`] it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecId(pub SmolStr);
