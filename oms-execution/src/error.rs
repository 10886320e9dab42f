use thiserror::Error;

/// Error taxonomy for the execution crate (spec.md §7): `StateViolation` and
/// `TransientRpc` map directly onto spec.md's taxonomy; callers decide how to
/// react (algo orders re-evaluate on the next market tick, the hedger rolls
/// back pending exposure).
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ExecutionError {
    /// FSM/invariant breach, e.g. replace on a terminal order. No state change
    /// is made when this is returned.
    #[error("state violation: {0}")]
    StateViolation(String),

    /// The gateway returned a non-success result for the request.
    #[error("transient rpc error: {0}")]
    TransientRpc(String),

    /// The RPC did not resolve before its timeout elapsed. The order is left
    /// in its pre-call state; the caller may retry `cancel` indefinitely.
    #[error("rpc timed out")]
    Timeout,

    /// The RPC's cancellation token fired before the gateway responded. Same
    /// no-state-change guarantee as `Timeout`: the exchange remains the
    /// authority on what actually happened (spec.md §5).
    #[error("rpc was cancelled")]
    Cancelled,
}
