//! Order totals.
//!
//! Totals are computed once, server-side, from the prices captured while
//! the stock is reserved. They never change after the order is created.

use serde::{Deserialize, Serialize};

use super::price::Price;

/// Subtotal at or above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD: Price = Price::new(3000);

/// Shipping fee charged below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Price = Price::new(50);

/// Shipping fee for a given subtotal.
#[must_use]
pub fn shipping_for(subtotal: Price) -> Price {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        Price::ZERO
    } else {
        FLAT_SHIPPING_FEE
    }
}

/// The money columns of an order.
///
/// Invariant: `total == subtotal + shipping + tax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Price,
    pub shipping: Price,
    pub tax: Price,
    pub total: Price,
}

impl OrderTotals {
    /// Compute totals from `(unit price, quantity)` pairs.
    ///
    /// Tax is always zero.
    #[must_use]
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Price, i32)>,
    {
        let subtotal: Price = lines
            .into_iter()
            .map(|(price, quantity)| price.times(quantity))
            .sum();
        let shipping = shipping_for(subtotal);
        let tax = Price::ZERO;

        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_boundary() {
        assert_eq!(shipping_for(Price::new(2999)), Price::new(50));
        assert_eq!(shipping_for(Price::new(3000)), Price::ZERO);
        assert_eq!(shipping_for(Price::new(3001)), Price::ZERO);
        assert_eq!(shipping_for(Price::ZERO), Price::new(50));
    }

    #[test]
    fn test_two_units_at_threshold_ship_free() {
        let totals = OrderTotals::from_lines([(Price::new(1500), 2)]);
        assert_eq!(totals.subtotal, Price::new(3000));
        assert_eq!(totals.shipping, Price::ZERO);
        assert_eq!(totals.tax, Price::ZERO);
        assert_eq!(totals.total, Price::new(3000));
    }

    #[test]
    fn test_small_order_pays_flat_fee() {
        let totals = OrderTotals::from_lines([(Price::new(1900), 1), (Price::new(250), 2)]);
        assert_eq!(totals.subtotal, Price::new(2400));
        assert_eq!(totals.shipping, Price::new(50));
        assert_eq!(totals.total, Price::new(2450));
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        for (price, quantity) in [(1, 1), (999, 3), (2999, 1), (3000, 1), (52_000, 4)] {
            let t = OrderTotals::from_lines([(Price::new(price), quantity)]);
            assert_eq!(t.total, t.subtotal + t.shipping + t.tax);
            assert_eq!(t.subtotal, Price::new(price).times(quantity));
        }
    }
}
