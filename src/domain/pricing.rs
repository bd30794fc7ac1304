use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use serde::Serialize;

use super::cart::Cart;
use super::errors::PaymentError;

/// Tax and fee rules applied on top of the cart subtotal at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPolicy {
    pub tax_rate: BigDecimal,
    pub flat_fee: BigDecimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: BigDecimal::new(10.into(), 2),
            flat_fee: BigDecimal::from(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTotals {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub fee: BigDecimal,
    pub total: BigDecimal,
}

impl PricingPolicy {
    pub fn totals(&self, cart: &Cart) -> CheckoutTotals {
        self.totals_for(&cart.sub_total())
    }

    pub fn totals_for(&self, subtotal: &BigDecimal) -> CheckoutTotals {
        let subtotal = subtotal.with_scale_round(2, RoundingMode::HalfUp);
        let tax = (&subtotal * &self.tax_rate).with_scale_round(2, RoundingMode::HalfUp);
        let fee = self.flat_fee.with_scale_round(2, RoundingMode::HalfUp);
        let total = &subtotal + &tax + &fee;
        CheckoutTotals {
            subtotal,
            tax,
            fee,
            total,
        }
    }
}

/// Convert a currency amount into the provider's minor units (cents).
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, PaymentError> {
    if amount <= &BigDecimal::zero() {
        return Err(PaymentError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidAmount(format!("amount {amount} out of range")))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::cart::tests::phone;

    #[test]
    fn totals_add_rounded_tax_and_flat_fee() {
        let cart = Cart::from_items([phone(42, "199.99", 1)]).unwrap();

        let totals = PricingPolicy::default().totals(&cart);

        assert_eq!(totals.subtotal, BigDecimal::from_str("199.99").unwrap());
        assert_eq!(totals.tax, BigDecimal::from_str("20.00").unwrap());
        assert_eq!(totals.fee, BigDecimal::from_str("5.00").unwrap());
        assert_eq!(totals.total, BigDecimal::from_str("224.99").unwrap());
    }

    #[test]
    fn default_tax_rate_is_ten_percent() {
        assert_eq!(PricingPolicy::default().tax_rate, BigDecimal::from_str("0.10").unwrap());
    }

    #[test]
    fn minor_units_round_half_up() {
        let amount = BigDecimal::from_str("224.985").unwrap();
        assert_eq!(to_minor_units(&amount).unwrap(), 22499);
    }

    #[test]
    fn minor_units_reject_non_positive_amounts() {
        assert!(to_minor_units(&BigDecimal::zero()).is_err());
        assert!(to_minor_units(&BigDecimal::from(-3)).is_err());
    }
}
