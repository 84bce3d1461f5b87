//! Value Objects

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() });
        }
        Ok(Money { amount: self.amount + other.amount, currency: self.currency.clone() })
    }
    pub fn multiply(&self, qty: u32) -> Money { Money { amount: self.amount * Decimal::from(qty), currency: self.currency.clone() } }

    /// Sums an iterator of amounts, starting from zero in `currency`.
    pub fn sum<'a>(currency: &str, amounts: impl IntoIterator<Item = &'a Money>) -> Result<Money, MoneyError> {
        amounts.into_iter().try_fold(Money::zero(currency), |acc, m| acc.add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_add() {
        let a = Money::new(Decimal::new(100, 0), "jpy");
        let b = Money::new(Decimal::new(50, 0), "JPY");
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::zero("USD")).is_err());
    }

    #[test]
    fn test_money_sum_and_multiply() {
        let prices = [Money::new(Decimal::new(1250, 2), "USD").multiply(2), Money::new(Decimal::new(300, 2), "USD")];
        let total = Money::sum("USD", &prices).unwrap();
        assert_eq!(total.amount(), Decimal::new(2800, 2));
        assert_eq!(Money::sum("USD", std::iter::empty()).unwrap(), Money::zero("USD"));
    }
}
