use thiserror::Error;

/// Errors generated by the low-level integration plumbing (ring buffer
/// construction, subscription bookkeeping). Named `SocketError` to match the
/// vocabulary the rest of the ecosystem uses for "something went wrong talking to
/// the outside world", even though this crate itself has no sockets.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SocketError {
    #[error("ring buffer capacity must be a power of two, got {0}")]
    InvalidCapacity(usize),

    #[error("subscriber key already registered for this instrument: {0}")]
    DuplicateSubscriber(String),
}
