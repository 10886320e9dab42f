use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

/// Closed set of venues the OMS knows how to talk to, plus an escape hatch for
/// venues added without a workspace release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExchangeId {
    Binance,
    Bybit,
    OkX,
    Bitmex,
    Deribit,
    Other(SmolStr),
}

impl ExchangeId {
    pub fn as_str(&self) -> &str {
        match self {
            ExchangeId::Binance => "binance",
            ExchangeId::Bybit => "bybit",
            ExchangeId::OkX => "okx",
            ExchangeId::Bitmex => "bitmex",
            ExchangeId::Deribit => "deribit",
            ExchangeId::Other(name) => name.as_str(),
        }
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
