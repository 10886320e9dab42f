//! Currency interning and currency-tagged decimal amounts.
//!
//! Conversions between currencies are never implicit: [`CurrencyAmount`] carries its
//! [`Currency`] tag everywhere and the only place amounts cross currencies is the FX
//! service in `oms-strategy::hedge::fx`.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// An interned, uppercase currency symbol (`"BTC"`, `"USDT"`, ...).
///
/// Interning via a process-wide registry means `Currency` equality is a cheap
/// [`SmolStr`] compare rather than an allocation-churning `String` compare, which
/// matters on the hot fill-accounting path where every fill tags an amount.
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency(SmolStr);

static REGISTRY: Lazy<RwLock<HashSet<SmolStr>>> = Lazy::new(|| RwLock::new(HashSet::new()));

impl Currency {
    /// Intern `symbol`, upper-casing it first. Idempotent.
    pub fn new(symbol: impl AsRef<str>) -> Self {
        let upper = SmolStr::new(symbol.as_ref().to_ascii_uppercase());
        {
            let existing = REGISTRY.read();
            if let Some(found) = existing.get(&upper) {
                return Self(found.clone());
            }
        }
        let mut registry = REGISTRY.write();
        registry.insert(upper.clone());
        Self(upper)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<S: AsRef<str>> From<S> for Currency {
    fn from(value: S) -> Self {
        Currency::new(value)
    }
}

/// A decimal amount tagged with the [`Currency`] it is denominated in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub currency: Currency,
    pub amount: Decimal,
}

impl CurrencyAmount {
    pub fn new(currency: Currency, amount: Decimal) -> Self {
        Self { currency, amount }
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            currency,
            amount: Decimal::ZERO,
        }
    }

    pub fn is_same_currency(&self, other: &CurrencyAmount) -> bool {
        self.currency == other.currency
    }
}

impl Display for CurrencyAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
