//! The pricing engine.
//!
//! Everything in here is a pure function over catalogue snapshots and the restaurant's policy at order time. No
//! clock, no storage, no gateway. The order flow snapshots the inputs, calls [`price_order`], and persists the
//! result; nothing here is ever recomputed after the order exists.

use rust_decimal::Decimal;
use thiserror::Error;
use tiffin_common::Money;

use crate::db_types::{MenuItem, Restaurant};

/// GST applied to the cart subtotal. 5%.
pub const TAX_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// How far in the future the estimated delivery time is set when an order is placed.
pub const DELIVERY_LEAD_TIME_MINUTES: i64 = 45;

#[derive(Debug, Clone, Error)]
pub enum PricingError {
    #[error("Quantity for {item} must be a positive number, got {quantity}")]
    InvalidQuantity { item: String, quantity: i64 },
    #[error("Minimum order amount is {minimum}. The cart subtotal is {subtotal}")]
    BelowMinimumOrder { minimum: Money, subtotal: Money },
}

/// The result of pricing a cart. `total == subtotal + tax + delivery_fee` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

/// Prices a cart of `(menu item, quantity)` pairs against the restaurant's policy.
///
/// Per-line totals and the subtotal are exact decimal sums; rounding (half-up, two decimal places) is applied once,
/// at the point the tax is derived. The delivery fee is whatever the restaurant charges *now* — it is the caller's
/// job to persist the result so that later fee changes do not reprice existing orders.
pub fn price_order(items: &[(&MenuItem, i64)], restaurant: &Restaurant) -> Result<PriceBreakdown, PricingError> {
    for (item, quantity) in items {
        if *quantity <= 0 {
            return Err(PricingError::InvalidQuantity { item: item.name.clone(), quantity: *quantity });
        }
    }
    let subtotal: Money = items.iter().map(|(item, quantity)| item.price * *quantity).sum();
    if subtotal < restaurant.minimum_order {
        return Err(PricingError::BelowMinimumOrder { minimum: restaurant.minimum_order, subtotal });
    }
    let tax = Money::new(subtotal.value() * TAX_RATE).round_half_up();
    let delivery_fee = restaurant.delivery_fee;
    let total = subtotal + tax + delivery_fee;
    Ok(PriceBreakdown { subtotal, tax, delivery_fee, total })
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    fn restaurant(minimum_order: Money, delivery_fee: Money) -> Restaurant {
        Restaurant { id: 1, name: "Saffron House".to_string(), is_open: true, minimum_order, delivery_fee }
    }

    fn item(name: &str, price: &str) -> MenuItem {
        MenuItem {
            id: 1,
            restaurant_id: 1,
            name: name.to_string(),
            price: Money::from_str(price).unwrap(),
            is_available: true,
        }
    }

    #[test]
    fn two_thalis_at_299() {
        let thali = item("Paneer Thali", "299");
        let policy = restaurant(Money::from_rupees(200), Money::from_rupees(30));
        let breakdown = price_order(&[(&thali, 2)], &policy).unwrap();
        assert_eq!(breakdown.subtotal, Money::from_rupees(598));
        assert_eq!(breakdown.tax, Money::from_str("29.90").unwrap());
        assert_eq!(breakdown.delivery_fee, Money::from_rupees(30));
        assert_eq!(breakdown.total, Money::from_str("657.90").unwrap());
    }

    #[test]
    fn total_always_equals_the_sum_of_its_parts() {
        let a = item("Masala Dosa", "120.50");
        let b = item("Filter Coffee", "35.25");
        let policy = restaurant(Money::ZERO, Money::from_rupees(25));
        let breakdown = price_order(&[(&a, 3), (&b, 2)], &policy).unwrap();
        assert_eq!(breakdown.subtotal, Money::from_str("432.00").unwrap());
        assert_eq!(breakdown.total, breakdown.subtotal + breakdown.tax + breakdown.delivery_fee);
    }

    #[test]
    fn tax_is_rounded_half_up_once() {
        // 5% of 199.90 is 9.995, which must round up to 10.00 rather than truncate.
        let snack = item("Vada Pav", "199.90");
        let policy = restaurant(Money::ZERO, Money::ZERO);
        let breakdown = price_order(&[(&snack, 1)], &policy).unwrap();
        assert_eq!(breakdown.tax, Money::from_rupees(10));
        assert_eq!(breakdown.total, Money::from_str("209.90").unwrap());
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let thali = item("Paneer Thali", "299");
        let policy = restaurant(Money::ZERO, Money::ZERO);
        assert!(matches!(
            price_order(&[(&thali, 0)], &policy),
            Err(PricingError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            price_order(&[(&thali, -2)], &policy),
            Err(PricingError::InvalidQuantity { quantity: -2, .. })
        ));
    }

    #[test]
    fn rejects_carts_below_the_minimum_order() {
        let snack = item("Samosa", "150");
        let policy = restaurant(Money::from_rupees(200), Money::from_rupees(30));
        let err = price_order(&[(&snack, 1)], &policy).unwrap_err();
        assert!(matches!(err, PricingError::BelowMinimumOrder { .. }));
    }

    #[test]
    fn minimum_order_boundary_is_inclusive() {
        let snack = item("Samosa", "200");
        let policy = restaurant(Money::from_rupees(200), Money::ZERO);
        assert!(price_order(&[(&snack, 1)], &policy).is_ok());
    }
}
