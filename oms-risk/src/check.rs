//! Pre-trade risk checks, run synchronously before an [`oms_execution::Order`]
//! is submitted.

use oms_execution::ids::ClientOrderId;
use oms_instrument::{currency::CurrencyAmount, instrument::InstrumentId, num::{Price, Quantity}, side::Side};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RiskCheckError {
    #[error("{check}: limit breached ({detail})")]
    LimitBreached { check: &'static str, detail: String },
}

/// Everything a pre-trade check needs to evaluate one prospective order.
/// `current_position` and `open_order_notional` describe state *before* this
/// order; checks evaluate what would happen if it were accepted.
#[derive(Debug, Clone)]
pub struct RiskContext {
    pub client_order_id: ClientOrderId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub current_position: Quantity,
    pub open_order_notional: CurrencyAmount,
    pub new_order_notional: CurrencyAmount,
}

/// A single, independently testable risk rule. Implementations must be pure
/// and side-effect free: the engine may run them in any order and more than
/// once for the same context.
pub trait RiskCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, context: &RiskContext) -> Result<(), RiskCheckError>;
}

/// Rejects an order that would push `|position|` past `limit` (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub struct MaxAbsPosition {
    pub limit: Quantity,
}

impl RiskCheck for MaxAbsPosition {
    fn name(&self) -> &'static str {
        "max_abs_position"
    }

    fn check(&self, context: &RiskContext) -> Result<(), RiskCheckError> {
        let delta = context.side.sign() * context.quantity.ticks();
        let prospective = Quantity::from_ticks(context.current_position.ticks() + delta);
        if prospective.ticks().abs() > self.limit.ticks() {
            return Err(RiskCheckError::LimitBreached {
                check: self.name(),
                detail: format!(
                    "prospective position {prospective} exceeds limit {}",
                    self.limit
                ),
            });
        }
        Ok(())
    }
}

/// Rejects an order that would push total resting notional (existing open
/// orders plus this one) past `limit`, denominated in `limit.currency`
/// (spec.md §4.3). Orders denominated in a different currency are out of
/// scope for this check — compose a separate instance per currency.
#[derive(Debug, Clone)]
pub struct MaxOpenOrderNotional {
    pub limit: CurrencyAmount,
}

impl RiskCheck for MaxOpenOrderNotional {
    fn name(&self) -> &'static str {
        "max_open_order_notional"
    }

    fn check(&self, context: &RiskContext) -> Result<(), RiskCheckError> {
        if !context.open_order_notional.is_same_currency(&self.limit)
            || !context.new_order_notional.is_same_currency(&self.limit)
        {
            return Ok(());
        }
        let prospective: Decimal = context.open_order_notional.amount + context.new_order_notional.amount;
        if prospective > self.limit.amount {
            return Err(RiskCheckError::LimitBreached {
                check: self.name(),
                detail: format!(
                    "prospective open notional {prospective} {} exceeds limit {}",
                    self.limit.currency, self.limit.amount
                ),
            });
        }
        Ok(())
    }
}
