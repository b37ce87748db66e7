//! Cross rates between arbitrary currencies, pivoting through the base currency.

use crate::core::currency::CurrencyCode;
use crate::core::error::{BudgetError, Result};
use crate::core::rates::{RateSnapshot, RateTable};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Converts between currencies using one consistent [`RateSnapshot`].
#[derive(Debug, Clone)]
pub struct RateConverter {
    rates: Arc<RateSnapshot>,
}

impl RateConverter {
    pub fn new(rates: Arc<RateSnapshot>) -> Self {
        Self { rates }
    }

    pub fn from_table(table: &RateTable) -> Self {
        Self::new(table.snapshot())
    }

    /// Factor such that `amount_in_to = amount_in_from * factor`.
    pub fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal> {
        let from_rate = self.rates.get(from);
        let to_rate = self.rates.get(to);

        match (from_rate, to_rate) {
            (Some(from_rate), Some(to_rate)) => {
                let factor = to_rate.checked_div(from_rate).ok_or_else(|| {
                    BudgetError::AmountOverflow(format!("rate from {from} to {to}"))
                })?;
                debug!("Exchange rate from {from} to {to}: {factor}");
                Ok(factor)
            }
            _ => {
                let mut missing = Vec::new();
                if from_rate.is_none() {
                    missing.push(from.to_string());
                }
                if to_rate.is_none() && from != to {
                    missing.push(to.to_string());
                }
                debug!("Currency rates for {from} or {to} not found");
                Err(BudgetError::CurrencyUnavailable(missing))
            }
        }
    }

    pub fn convert(&self, amount: Decimal, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal> {
        let rate = self.rate(from, to)?;
        amount
            .checked_mul(rate)
            .ok_or_else(|| BudgetError::AmountOverflow(format!("{amount} {from} in {to}")))
    }
}
