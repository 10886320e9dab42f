//! Net position accounting (spec.md §3 `Position.ApplyFill`).

use oms_instrument::{
    instrument::InstrumentId,
    num::{Price, Quantity},
    side::Side,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A net position in one instrument. `quantity` is signed: positive is long,
/// negative is short, zero is flat (in which case `avg_entry_price` is the
/// `Price::ZERO` sentinel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument_id: InstrumentId,
    pub quantity: Quantity,
    pub avg_entry_price: Price,
    pub realized_pnl: Decimal,
    pub last_update_us: i64,
}

impl Position {
    pub fn flat(instrument_id: InstrumentId) -> Self {
        Self {
            instrument_id,
            quantity: Quantity::ZERO,
            avg_entry_price: Price::ZERO,
            realized_pnl: Decimal::ZERO,
            last_update_us: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Apply one fill, following spec.md §3's four cases (adding, reducing,
    /// flipping, flat), and return the realized PnL this fill produced (zero
    /// unless it reduced or flipped the position).
    pub fn apply_fill(
        &mut self,
        side: Side,
        price: Price,
        quantity: Quantity,
        contract_multiplier: Decimal,
        timestamp_us: i64,
    ) -> Decimal {
        let delta_ticks = side.sign() * quantity.ticks().abs();
        let old_qty_ticks = self.quantity.ticks();

        let realized = if old_qty_ticks == 0 {
            self.avg_entry_price = price;
            self.quantity = Quantity::from_ticks(delta_ticks);
            Decimal::ZERO
        } else if old_qty_ticks.signum() == delta_ticks.signum() {
            // Same-sign add: weighted-average the entry price.
            let old_abs = Quantity::from_ticks(old_qty_ticks.abs());
            let add_abs = Quantity::from_ticks(delta_ticks.abs());
            let numerator =
                old_abs.to_decimal() * self.avg_entry_price.to_decimal() + add_abs.to_decimal() * price.to_decimal();
            let denominator = old_abs.to_decimal() + add_abs.to_decimal();
            self.avg_entry_price = Price::from_decimal(numerator / denominator)
                .unwrap_or(self.avg_entry_price);
            self.quantity = Quantity::from_ticks(old_qty_ticks + delta_ticks);
            Decimal::ZERO
        } else {
            // Opposite side: reduce or flip.
            let position_sign = Decimal::from(old_qty_ticks.signum());
            let old_abs = old_qty_ticks.abs();
            let delta_abs = delta_ticks.abs();
            let closed_ticks = old_abs.min(delta_abs);
            let closed_qty = Quantity::from_ticks(closed_ticks);
            let realized = (price.to_decimal() - self.avg_entry_price.to_decimal())
                * closed_qty.to_decimal()
                * contract_multiplier
                * position_sign;

            if delta_abs <= old_abs {
                // Reduce: average entry price is unchanged.
                self.quantity = Quantity::from_ticks(old_qty_ticks + delta_ticks);
                if self.quantity.is_zero() {
                    self.avg_entry_price = Price::ZERO;
                }
            } else {
                // Flip: close fully, then open the residual at the fill price.
                let residual_ticks = delta_abs - old_abs;
                self.quantity = Quantity::from_ticks(delta_ticks.signum() * residual_ticks);
                self.avg_entry_price = price;
            }
            realized
        };

        self.last_update_us = timestamp_us;
        self.realized_pnl += realized;
        realized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn opening_a_flat_position_sets_avg_entry() {
        let mut pos = Position::flat(InstrumentId(0));
        pos.apply_fill(
            Side::Buy,
            Price::from_decimal(dec!(100)).unwrap(),
            Quantity::from_decimal(dec!(10)).unwrap(),
            dec!(1),
            1,
        );
        assert_eq!(pos.quantity, Quantity::from_decimal(dec!(10)).unwrap());
        assert_eq!(pos.avg_entry_price, Price::from_decimal(dec!(100)).unwrap());
    }

    #[test]
    fn adding_same_sign_weight_averages_entry_price() {
        let mut pos = Position::flat(InstrumentId(0));
        pos.apply_fill(
            Side::Buy,
            Price::from_decimal(dec!(100)).unwrap(),
            Quantity::from_decimal(dec!(10)).unwrap(),
            dec!(1),
            1,
        );
        pos.apply_fill(
            Side::Buy,
            Price::from_decimal(dec!(110)).unwrap(),
            Quantity::from_decimal(dec!(10)).unwrap(),
            dec!(1),
            2,
        );
        assert_eq!(pos.quantity, Quantity::from_decimal(dec!(20)).unwrap());
        assert_eq!(pos.avg_entry_price, Price::from_decimal(dec!(105)).unwrap());
    }

    #[test]
    fn flip_from_long_to_short_realizes_pnl_on_the_closed_portion() {
        let mut pos = Position::flat(InstrumentId(0));
        pos.apply_fill(
            Side::Buy,
            Price::from_decimal(dec!(100)).unwrap(),
            Quantity::from_decimal(dec!(10)).unwrap(),
            dec!(1),
            1,
        );
        let realized = pos.apply_fill(
            Side::Sell,
            Price::from_decimal(dec!(120)).unwrap(),
            Quantity::from_decimal(dec!(15)).unwrap(),
            dec!(1),
            2,
        );
        assert_eq!(realized, dec!(200));
        assert_eq!(pos.quantity, Quantity::from_decimal(dec!(-5)).unwrap());
        assert_eq!(pos.avg_entry_price, Price::from_decimal(dec!(120)).unwrap());
    }

    #[test]
    fn reducing_to_flat_resets_avg_entry_sentinel() {
        let mut pos = Position::flat(InstrumentId(0));
        pos.apply_fill(
            Side::Buy,
            Price::from_decimal(dec!(100)).unwrap(),
            Quantity::from_decimal(dec!(10)).unwrap(),
            dec!(1),
            1,
        );
        pos.apply_fill(
            Side::Sell,
            Price::from_decimal(dec!(105)).unwrap(),
            Quantity::from_decimal(dec!(10)).unwrap(),
            dec!(1),
            2,
        );
        assert!(pos.is_flat());
        assert_eq!(pos.avg_entry_price, Price::ZERO);
    }

    #[test]
    fn realized_pnl_accumulates_linearly_across_reductions() {
        let mut pos = Position::flat(InstrumentId(0));
        pos.apply_fill(
            Side::Buy,
            Price::from_decimal(dec!(100)).unwrap(),
            Quantity::from_decimal(dec!(10)).unwrap(),
            dec!(1),
            1,
        );
        pos.apply_fill(
            Side::Sell,
            Price::from_decimal(dec!(110)).unwrap(),
            Quantity::from_decimal(dec!(5)).unwrap(),
            dec!(1),
            2,
        );
        pos.apply_fill(
            Side::Sell,
            Price::from_decimal(dec!(120)).unwrap(),
            Quantity::from_decimal(dec!(5)).unwrap(),
            dec!(1),
            3,
        );
        // (110-100)*5 + (120-100)*5 == 50 + 100
        assert_eq!(pos.realized_pnl, dec!(150));
        assert!(pos.is_flat());
    }
}
