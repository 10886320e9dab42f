//! The immutable instrument catalog.
//!
//! An [`Instrument`] never changes after it is registered: tick/lot rules, the
//! currencies it trades against, and its contract multiplier are all fixed at
//! subscription time. Everything downstream (the order book, the router, positions)
//! keys off the dense [`InstrumentId`] rather than the symbol string.

use crate::{currency::CurrencyAmount, exchange::ExchangeId, num::Price, num::Quantity, Currency};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;
use thiserror::Error;

/// A dense, small, process-stable instrument index. Assigned once, at registration,
/// and never reused for a different instrument during the lifetime of the process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentId(pub u32);

/// The tagged union of instrument variants the OMS understands.
///
/// Modelled as a flat enum rather than an inheritance hierarchy (Design Notes §9):
/// the per-variant "virtual" behaviour (`denomination_currency`, `notional`) becomes
/// pattern-matched free functions instead of trait dispatch, since the set of
/// variants is closed and known at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_id: InstrumentId,
    pub symbol: SmolStr,
    pub source_exchange: ExchangeId,
    pub base_currency: Currency,
    pub quote_currency: Currency,
    pub tick_size: Price,
    pub lot_size: Quantity,
    pub min_order_size: Quantity,
    pub kind: InstrumentKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrumentKind {
    Spot,
    /// Linear perpetual/future: notional accrues in `quote_currency`.
    Linear { contract_multiplier: Quantity },
    /// Inverse perpetual/future: notional accrues in `base_currency` (see
    /// `DESIGN.md` for the BITMEX vs. non-BITMEX ambiguity this resolves).
    Inverse { contract_multiplier: Quantity },
    DatedFuture {
        contract_multiplier: Quantity,
        expiry_unix_us: i64,
    },
}

impl Instrument {
    /// The currency PnL for this instrument accrues in: quote for spot/linear,
    /// base for inverse and dated futures (settlement currency).
    pub fn denomination_currency(&self) -> Currency {
        match &self.kind {
            InstrumentKind::Spot | InstrumentKind::Linear { .. } => self.quote_currency.clone(),
            InstrumentKind::Inverse { .. } | InstrumentKind::DatedFuture { .. } => {
                self.base_currency.clone()
            }
        }
    }

    /// Notional value of `qty` at `price`, in [`Self::denomination_currency`].
    ///
    /// * Spot: `price * qty`.
    /// * Linear: `price * qty * contract_multiplier`.
    /// * Inverse: `(1 / price) * qty * contract_multiplier` (size is denominated in
    ///   the quote currency while settlement happens in the base currency).
    pub fn notional(&self, price: Price, qty: Quantity) -> CurrencyAmount {
        let price_dec = price.to_decimal();
        let qty_dec = qty.to_decimal();
        let amount = match &self.kind {
            InstrumentKind::Spot => price_dec * qty_dec,
            InstrumentKind::Linear { contract_multiplier }
            | InstrumentKind::DatedFuture {
                contract_multiplier, ..
            } => price_dec * qty_dec * contract_multiplier.to_decimal(),
            InstrumentKind::Inverse { contract_multiplier } => {
                if price_dec.is_zero() {
                    rust_decimal::Decimal::ZERO
                } else {
                    (rust_decimal::Decimal::ONE / price_dec)
                        * qty_dec
                        * contract_multiplier.to_decimal()
                }
            }
        };
        CurrencyAmount::new(self.denomination_currency(), amount)
    }

    /// Notional value of one unit of quantity at `price` — used by the hedger to
    /// convert a target `CurrencyAmount` back into a hedge-leg quantity.
    pub fn unit_value(&self, price: Price) -> CurrencyAmount {
        self.notional(price, Quantity::from_ticks(crate::num::TICK_SCALE))
    }

    pub fn round_price_to_tick(&self, price: Price) -> Price {
        price.floor_to(self.tick_size)
    }

    pub fn round_qty_to_lot(&self, qty: Quantity) -> Quantity {
        qty.floor_to(self.lot_size)
    }
}

#[derive(Debug, Clone, Error)]
pub enum InstrumentRegistryError {
    #[error("duplicate instrument symbol: {0}")]
    DuplicateSymbol(SmolStr),
    #[error("unknown instrument id: {0:?}")]
    UnknownId(InstrumentId),
    #[error("unknown instrument symbol: {0}")]
    UnknownSymbol(SmolStr),
}

/// Append-only catalog of tradable instruments, built once at startup.
///
/// Mirrors the teacher's `IndexedInstruments` pattern (`Vec<Keyed<InstrumentIndex, _>>`)
/// but owns the storage directly rather than a free-floating `Vec`, since this
/// registry is the sole writer during startup and read-only for the rest of the
/// process's life.
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    by_id: Vec<Instrument>,
    by_symbol: HashMap<SmolStr, InstrumentId>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new instrument, assigning it the next dense id. The instrument's
    /// own `instrument_id` field is overwritten to match.
    pub fn register(
        &mut self,
        mut instrument: Instrument,
    ) -> Result<InstrumentId, InstrumentRegistryError> {
        if self.by_symbol.contains_key(&instrument.symbol) {
            return Err(InstrumentRegistryError::DuplicateSymbol(
                instrument.symbol.clone(),
            ));
        }
        let id = InstrumentId(self.by_id.len() as u32);
        instrument.instrument_id = id;
        self.by_symbol.insert(instrument.symbol.clone(), id);
        self.by_id.push(instrument);
        Ok(id)
    }

    pub fn get(&self, id: InstrumentId) -> Result<&Instrument, InstrumentRegistryError> {
        self.by_id
            .get(id.0 as usize)
            .ok_or(InstrumentRegistryError::UnknownId(id))
    }

    pub fn find_by_symbol(&self, symbol: &str) -> Result<InstrumentId, InstrumentRegistryError> {
        self.by_symbol
            .get(symbol)
            .copied()
            .ok_or_else(|| InstrumentRegistryError::UnknownSymbol(SmolStr::new(symbol)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.by_id.iter()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// External collaborator (spec.md §6): loads the instrument catalog from whatever
/// medium a deployment uses (CSV file, REST discovery endpoint, ...). CSV parsing
/// itself is out of scope here — this crate only defines the seam a production
/// binary implements.
pub trait InstrumentSource {
    type Error: std::error::Error;

    fn load(&self) -> Result<Vec<Instrument>, Self::Error>;
}
