pub mod chart;
pub mod rates;
pub mod setup;
pub mod summary;
pub mod ui;

use crate::core::error::BudgetError;

/// Wraps a core error, pointing at the fix when rates are missing.
pub fn explain(err: BudgetError) -> anyhow::Error {
    match &err {
        BudgetError::CurrencyUnavailable(_) => anyhow::Error::new(err).context(
            "Missing exchange rates; run `tripcost rates refresh --force` or check the currency codes",
        ),
        _ => anyhow::Error::new(err),
    }
}
