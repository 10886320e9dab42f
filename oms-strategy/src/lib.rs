#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Strategy
//!
//! Quoting instance, fair value providers and the cross-instrument hedger
//! (spec.md §4.5, §4.6, §4.7).

pub mod fair_value;
pub mod hedge;
pub mod quote;

pub use fair_value::{FairValueModel, FairValueProvider, FairValueUpdate};
pub use hedge::{FxService, Hedger, HedgerParameters, ReferenceBookFx};
pub use quote::{QuotePair, QuotingInstance, QuotingParameters};
