use serde::{Deserialize, Serialize};

/// Pairs a value with the key it is indexed by.
///
/// Used wherever a collection is keyed by a dense index (`InstrumentId`,
/// `ExchangeIndex`, ...) but call sites also want the value itself without a second
/// lookup, e.g. when iterating an [`InstrumentRegistry`](crate::instrument::InstrumentRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Keyed<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Keyed<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}
