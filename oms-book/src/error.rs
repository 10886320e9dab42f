use oms_instrument::instrument::InstrumentId;
use thiserror::Error;

/// Errors surfaced by the order book and market data distributor.
///
/// Per spec.md §7, `InputError` and `SequenceGap` are recovered locally (logged at
/// `WARN`, event dropped) rather than propagated — this enum exists for tests,
/// metrics, and the rare caller that wants to distinguish *why* `apply_event`
/// didn't apply, not as something the hot path unwinds on.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BookError {
    #[error("event for instrument {event:?} does not match book instrument {book:?}")]
    InstrumentMismatch {
        book: InstrumentId,
        event: InstrumentId,
    },

    #[error("BestOrderBook event had update_count {0}, expected 2")]
    UnexpectedBestBookUpdateCount(usize),
}
